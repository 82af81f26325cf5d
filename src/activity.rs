// Activity log: who did what, and whether it worked

use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Role of the person driving the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Receptionist,
}

impl Role {
    /// Receptionists may add and browse visits, but not change or remove them
    pub fn can_modify(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Receptionist => write!(f, "Receptionist"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "receptionist" | "reception" => Ok(Role::Receptionist),
            other => Err(format!("unknown role: {} (expected admin or receptionist)", other)),
        }
    }
}

/// Fire-and-forget audit trail
pub trait ActivityLog {
    fn record(&self, role: Role, action: &str, success: bool);
    fn logout(&self, role: Role);
}

/// Appends one line per activity to a text file
///
/// Write failures are reported through `tracing` and otherwise ignored.
pub struct FileActivityLog {
    path: PathBuf,
}

impl FileActivityLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn append(&self, entry: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", entry));

        match result {
            Ok(()) => debug!(file = ?self.path, entry, "Logged activity"),
            Err(e) => warn!(file = ?self.path, error = ?e, entry, "Failed to write activity log"),
        }
    }
}

impl ActivityLog for FileActivityLog {
    fn record(&self, role: Role, action: &str, success: bool) {
        let status = if success { "Success" } else { "Failure" };
        self.append(&format!("{} | {} | {} | Status: {}", timestamp(), role, action, status));
    }

    fn logout(&self, role: Role) {
        self.append(&format!("{} | {} | {} Logged Out", timestamp(), role, role));
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{ActivityLog, Role};
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct MemoryActivityLog {
        pub entries: RefCell<Vec<(Role, String, bool)>>,
    }

    impl ActivityLog for MemoryActivityLog {
        fn record(&self, role: Role, action: &str, success: bool) {
            self.entries.borrow_mut().push((role, action.to_string(), success));
        }

        fn logout(&self, role: Role) {
            self.entries.borrow_mut().push((role, "Logged Out".to_string(), true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_role_parse_and_permissions() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("reception".parse::<Role>().unwrap(), Role::Receptionist);
        assert!("doctor".parse::<Role>().is_err());

        assert!(Role::Admin.can_modify());
        assert!(!Role::Receptionist.can_modify());
    }

    #[test]
    fn test_file_activity_log_appends_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.txt");
        let log = FileActivityLog::new(&path);

        log.record(Role::Receptionist, "Adding Entry for Jane Doe", true);
        log.record(Role::Admin, "Deleting Entry 4", false);
        log.logout(Role::Admin);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("| Receptionist | Adding Entry for Jane Doe | Status: Success"));
        assert!(lines[1].ends_with("| Admin | Deleting Entry 4 | Status: Failure"));
        assert!(lines[2].ends_with("| Admin | Admin Logged Out"));
    }

    #[test]
    fn test_file_activity_log_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let log = FileActivityLog::new(temp.path());
        log.record(Role::Admin, "Anything", true);
    }
}
