//! Tolerant environment-variable readers.

use std::collections::HashMap;

pub enum EnvSource<'a> {
    Process,
    Map(&'a HashMap<String, String>),
}

impl EnvSource<'_> {
    pub fn raw(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Map(map) => map.get(name).cloned(),
        }
    }

    pub fn flag(&self, name: &str, default: bool) -> bool {
        let Some(raw) = self.raw(name) else {
            return default;
        };
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                ke_log::warn!(
                    "invalid value for environment variable {name}={other:?}; using default"
                );
                default
            }
        }
    }

    pub fn int(&self, name: &str, default: i64, minimum: Option<i64>) -> i64 {
        let value = self
            .raw(name)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(default);
        match minimum {
            Some(minimum) => value.max(minimum),
            None => value,
        }
    }

    pub fn text(&self, name: &str, default: &str) -> String {
        match self.raw(name) {
            Some(raw) if !raw.trim().is_empty() => raw.trim().to_owned(),
            _ => default.to_owned(),
        }
    }

    pub fn csv(&self, name: &str) -> Vec<String> {
        let raw = self.text(name, "");
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// A `WxH`-style resolution; also accepts `,` and `:` separators.
    pub fn resolution(&self, name: &str) -> Option<(u32, u32)> {
        let raw = self.text(name, "").to_lowercase().replace(' ', "");
        if raw.is_empty() {
            return None;
        }
        for separator in ['x', ',', ':'] {
            if let Some((left, right)) = raw.split_once(separator) {
                let width = left.parse::<u32>().ok()?.max(1);
                let height = right.parse::<u32>().ok()?.max(1);
                return Some((width, height));
            }
        }
        None
    }

    /// A path list split on `;` or the platform path separator.
    pub fn path_list(&self, name: &str) -> Vec<String> {
        let raw = self.text(name, "");
        if raw.is_empty() {
            return Vec::new();
        }
        let separator = if raw.contains(';') { ';' } else { ':' };
        raw.split(separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
