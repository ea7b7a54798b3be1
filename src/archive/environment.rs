//! Host environment snapshots for diagnostics archives

use std::sync::{Mutex, PoisonError};

use chrono::Local;
use sysinfo::{ProcessesToUpdate, System};

/// A running application as reported by the environment provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveApplication {
    /// Process name
    pub name: String,
    /// Stable identifier, the executable path where available
    pub identifier: String,
    /// Process ID
    pub pid: u32,
}

/// Optional capability that describes the host for diagnostics archives
pub trait EnvironmentProvider: Send + Sync {
    /// Plain-text summary of OS, hardware and current process facts
    fn snapshot(&self) -> String;

    /// Applications currently running on the host
    fn active_applications(&self) -> Vec<ActiveApplication>;
}

/// Render applications one per line as `name<TAB>identifier<TAB>pid`
pub fn render_applications(apps: &[ActiveApplication]) -> String {
    apps.iter()
        .map(|app| format!("{}\t{}\t{}\n", app.name, app.identifier, app.pid))
        .collect()
}

/// Environment provider backed by `sysinfo`
pub struct HostEnvironment {
    system: Mutex<System>,
}

impl HostEnvironment {
    /// Returns `None` on platforms `sysinfo` cannot inspect
    pub fn detect() -> Option<Self> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return None;
        }
        Some(Self {
            system: Mutex::new(System::new()),
        })
    }
}

impl EnvironmentProvider for HostEnvironment {
    fn snapshot(&self) -> String {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();
        system.refresh_cpu_all();

        let unknown = || "unknown".to_string();
        let exe = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| unknown());

        let lines = [
            format!("Generated: {}", Local::now().to_rfc3339()),
            format!("OS: {}", System::long_os_version().unwrap_or_else(unknown)),
            format!("Kernel: {}", System::kernel_version().unwrap_or_else(unknown)),
            format!("Host: {}", System::host_name().unwrap_or_else(unknown)),
            format!("Architecture: {}", std::env::consts::ARCH),
            format!("CPUs: {}", system.cpus().len()),
            format!(
                "Memory: {} MiB used of {} MiB",
                system.used_memory() / (1024 * 1024),
                system.total_memory() / (1024 * 1024)
            ),
            format!("Uptime: {}s", System::uptime()),
            format!("Process: {} (pid {})", exe, std::process::id()),
        ];

        let mut report = lines.join("\n");
        report.push('\n');
        report
    }

    fn active_applications(&self) -> Vec<ActiveApplication> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes(ProcessesToUpdate::All, true);

        // Kernel threads have no executable and are skipped
        let mut apps: Vec<ActiveApplication> = system
            .processes()
            .iter()
            .filter_map(|(pid, process)| {
                let exe = process.exe()?;
                Some(ActiveApplication {
                    name: process.name().to_string_lossy().into_owned(),
                    identifier: exe.display().to_string(),
                    pid: pid.as_u32(),
                })
            })
            .collect();

        apps.sort_by_key(|app| app.pid);
        apps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_applications() {
        let apps = vec![
            ActiveApplication {
                name: "editor".to_string(),
                identifier: "/usr/bin/editor".to_string(),
                pid: 42,
            },
            ActiveApplication {
                name: "shell".to_string(),
                identifier: "/bin/sh".to_string(),
                pid: 7,
            },
        ];

        assert_eq!(
            render_applications(&apps),
            "editor\t/usr/bin/editor\t42\nshell\t/bin/sh\t7\n"
        );
    }

    #[test]
    fn test_render_no_applications() {
        assert_eq!(render_applications(&[]), "");
    }

    #[test]
    fn test_host_snapshot_mentions_current_process() {
        let Some(host) = HostEnvironment::detect() else {
            return;
        };

        let snapshot = host.snapshot();
        assert!(snapshot.contains("OS: "));
        assert!(snapshot.contains(&format!("pid {}", std::process::id())));
    }
}
