//! Who is running this process, for holder records.

/// Name of the current user from the environment, or `unknown`.
pub fn current_user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The identity to announce: an explicit override, else the user name,
/// optionally suffixed with `@<hostname>`.
pub fn resolve(explicit: Option<&str>, include_host: bool) -> String {
    let name = match explicit {
        Some(name) => name.to_string(),
        None => current_user_name(),
    };
    if !include_host {
        return name;
    }

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}@{}", name, host)
}
