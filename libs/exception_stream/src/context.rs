use std::env;
use std::sync::OnceLock;

use time::OffsetDateTime;
use uuid::Uuid;

/// Name and version reported for exceptions raised by this process.
static APPLICATION: OnceLock<(String, String)> = OnceLock::new();

/// Sets the application name and version recorded by [`ContextInfo::capture`].
///
/// Only the first call has an effect. Returns whether this call set the value.
pub fn set_application(name: impl Into<String>, version: impl Into<String>) -> bool {
    APPLICATION.set((name.into(), version.into())).is_ok()
}

/// Gets the application name and version recorded for new exceptions.
///
/// If [`set_application`] was never called, this is the file stem of the
/// current executable with an empty version.
pub fn application() -> (&'static str, &'static str) {
    let (name, version) = APPLICATION.get_or_init(|| (exe_name(), String::new()));
    (name.as_str(), version.as_str())
}

fn exe_name() -> String {
    env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// Snapshot of the process and workflow an exception was raised in.
///
/// Integer fields use 0 and string fields use the empty string for "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfo {
    pub pid: u32,
    pub machine_name: String,
    pub app_name: String,
    pub user_name: String,
    pub app_version: String,
    pub exception_id: Uuid,
    /// Second precision. [`None`] is stored as 0.
    pub exception_time: Option<OffsetDateTime>,
    pub file_id: i32,
    pub action_id: i32,
    pub database_server: String,
    pub database_name: String,
    pub fps_context: String,
}

impl ContextInfo {
    /// Captures the current process state with a fresh exception id.
    ///
    /// The workflow fields stay unset.
    #[must_use]
    pub fn capture() -> Self {
        let (app_name, app_version) = application();
        let now = OffsetDateTime::now_utc();

        Self {
            pid: std::process::id(),
            machine_name: machine_name(),
            app_name: app_name.to_owned(),
            user_name: first_var(&["USERNAME", "USER"]),
            app_version: app_version.to_owned(),
            exception_id: Uuid::new_v4(),
            exception_time: Some(now.replace_nanosecond(0).unwrap_or(now)),
            ..Self::default()
        }
    }

    /// Fills the unset workflow fields from `other`.
    ///
    /// Used when wrapping an exception, so the outer one keeps the file,
    /// action, database and FPS context the inner one was raised under.
    pub fn inherit_from(&mut self, other: &Self) {
        fn inherit_str(target: &mut String, source: &str) {
            if target.is_empty() {
                source.clone_into(target);
            }
        }

        if self.file_id == 0 {
            self.file_id = other.file_id;
        }

        if self.action_id == 0 {
            self.action_id = other.action_id;
        }

        inherit_str(&mut self.database_server, &other.database_server);
        inherit_str(&mut self.database_name, &other.database_name);
        inherit_str(&mut self.fps_context, &other.fps_context);
    }
}

fn first_var(keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| env::var(k).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

fn machine_name() -> String {
    let name = first_var(&["COMPUTERNAME", "HOSTNAME"]);
    if !name.is_empty() {
        return name;
    }

    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}
