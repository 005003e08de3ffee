//! Per-injector settings.

/// Settings applied when an injector is built.
///
/// # Examples
/// ```
/// use sijill_injector::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.allow_override);
/// assert!(settings.name.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    /// Name shown in error messages, e.g. `StaticInjectorError(app)[...]`.
    pub name: Option<String>,

    /// Whether a later non-multi description may replace an earlier one
    /// for the same token. When `false` the build fails instead.
    pub allow_override: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: None,
            allow_override: true,
        }
    }
}
