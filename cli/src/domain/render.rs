//! Derived text files generated from the deployment configuration.
//!
//! Pure functions: configuration in, file contents out.

use indexmap::IndexMap;

use crate::domain::config::{SecurityConfig, SettingValue};

/// Placeholder replaced by the user list in access-control templates.
pub const USERS_PLACEHOLDER: &str = "$USERS";

/// Separator between user names in access-control files.
pub const USER_SEPARATOR: &str = "; ";

/// Remote name of the rendered settings file.
pub const SETTINGS_FILE: &str = "autoconfig.cfg";

/// Remote name of the rendered enabled-mods file.
pub const MODS_FILE: &str = "mods.cfg";

/// Render the flat `key = value` settings file, keys in configured order.
#[must_use]
pub fn render_settings(settings: &IndexMap<String, SettingValue>) -> String {
    settings
        .iter()
        .map(|(key, value)| format!("{key} = {value}\n"))
        .collect()
}

/// Render the newline-delimited enabled-items list.
#[must_use]
pub fn render_enabled_list(items: &[String]) -> String {
    items.iter().map(|item| format!("{item}\n")).collect()
}

/// Substitute every placeholder in `template` with the joined user names.
#[must_use]
pub fn render_access_template(template: &str, users: &[String]) -> String {
    template.replace(USERS_PLACEHOLDER, &users.join(USER_SEPARATOR))
}

/// User list to substitute into the security template named `file_name`.
///
/// Returns `None` for templates that are copied verbatim.
#[must_use]
pub fn users_for_template<'a>(file_name: &str, security: &'a SecurityConfig) -> Option<&'a [String]> {
    match file_name {
        "superadmin.cfg" => Some(&security.superadmins),
        "admin.cfg" => Some(&security.admins),
        _ => None,
    }
}
