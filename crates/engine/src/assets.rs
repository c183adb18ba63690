//! Visual assets injected into the host document.

/// Stylesheet for the loading pulse, icon sizing, and the degraded
/// fallback state. Injected once per session, removed at teardown.
pub const STYLESHEET: &str = r#"
.favlink-icon-loading {
  animation: favlink-icon-pulse 1.5s infinite;
  opacity: 0.6;
}
@keyframes favlink-icon-pulse {
  0%, 100% { opacity: 0.6; }
  50% { opacity: 0.9; }
}
.favlink-icon {
  width: 1em;
  height: 1em;
  display: inline-block;
  vertical-align: text-bottom;
  margin-right: 0.2em;
  object-fit: contain;
  transition: opacity 0.3s;
}
.favlink-icon-fallback {
  filter: grayscale(80%);
  opacity: 0.7;
}
"#;

/// Embedded generic globe glyph, used when no source yields an icon or
/// the resolved image fails to load.
pub const FALLBACK_ICON: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAyNCAyNCI+PHBhdGggZD0iTTEyIDJDNi40NzcgMiAyIDYuNDc3IDIgMTJzNC40NzcgMTAgMTAgMTAgMTAtNC40NzcgMTAtMTBTMTcuNTIzIDIgMTIgMnptLTEgMTVoLTJ2LTJoMnYyem0wLTEzaC0ydjZoMnYtNnoiIGZpbGw9IiM2NjYiLz48L3N2Zz4=";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_names_visual_states() {
        assert!(STYLESHEET.contains(".favlink-icon-loading"));
        assert!(STYLESHEET.contains(".favlink-icon-fallback"));
    }

    #[test]
    fn test_fallback_icon_is_data_uri() {
        assert!(FALLBACK_ICON.starts_with("data:image/svg+xml;base64,"));
    }
}
