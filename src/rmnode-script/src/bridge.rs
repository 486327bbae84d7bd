//! `MeterOption.*` calls, executed in-process against the host.
//!
//! Scripts run in a child process and cannot reach the skin, so these calls
//! arrive through the plugin's command surfaces instead and are answered here.
//! Every failure is logged and answered with `"false"` (setters) or the
//! caller's default (getters).

use crate::diagnostics::emit;
use rmnode_core::{BridgeError, Host, Severity};
use thiserror::Error;

pub const PREFIX: &str = "MeterOption.";

/// Bridge operations and their script-side parameter lists.
pub const OPERATIONS: &[(&str, &str)] = &[
    ("GetX", "meterName, defValue = ''"),
    ("GetY", "meterName, defValue = ''"),
    ("GetW", "meterName, defValue = ''"),
    ("GetH", "meterName, defValue = ''"),
    ("SetX", "meterName, value"),
    ("SetY", "meterName, value"),
    ("SetW", "meterName, value"),
    ("SetH", "meterName, value"),
    ("Show", "meterName"),
    ("Hide", "meterName"),
    ("SetProperty", "meterName, property, value"),
];

const TRUE: &str = "true";
const FALSE: &str = "false";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    X,
    Y,
    W,
    H,
}

impl Geometry {
    pub fn key(&self) -> &'static str {
        match self {
            Geometry::X => "X",
            Geometry::Y => "Y",
            Geometry::W => "W",
            Geometry::H => "H",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Show,
    Hide,
}

/// The closed set of bridge operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterCall {
    Get {
        attribute: Geometry,
        meter: String,
        default: String,
    },
    Set {
        attribute: Geometry,
        meter: String,
        value: String,
    },
    Toggle {
        visibility: Visibility,
        meter: String,
    },
    SetProperty {
        meter: String,
        property: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum MeterCallError {
    #[error("not a MeterOption call: {0}")]
    NotMeterCall(String),
    #[error("invalid function call format: {0}")]
    MissingParenthesis(String),
    #[error("unknown meter function: {0}")]
    UnknownOperation(String),
    #[error("{operation} expects {expected} argument(s), got {found}")]
    Arity {
        operation: String,
        expected: &'static str,
        found: usize,
    },
    #[error("{operation}: invalid meter name or value")]
    EmptyArgument { operation: String },
    #[error("{operation}: {source}")]
    Host {
        operation: String,
        source: BridgeError,
    },
}

pub fn is_meter_call(command: &str) -> bool {
    command.trim_start().starts_with(PREFIX)
}

impl MeterCall {
    /// Parse `MeterOption.Name(arg, ...)`.
    pub fn parse(command: &str) -> Result<Self, MeterCallError> {
        let command = command.trim();
        let body = command
            .strip_prefix(PREFIX)
            .ok_or_else(|| MeterCallError::NotMeterCall(command.to_string()))?;
        let open = body
            .find('(')
            .ok_or_else(|| MeterCallError::MissingParenthesis(command.to_string()))?;
        let name = body[..open].trim();
        let inner = body[open + 1..].trim_end();
        let inner = inner.strip_suffix(')').unwrap_or(inner);

        let arity_error = |expected: &'static str, found: usize| MeterCallError::Arity {
            operation: format!("{PREFIX}{name}"),
            expected,
            found,
        };

        let geometry = match name {
            "GetX" | "SetX" => Some(Geometry::X),
            "GetY" | "SetY" => Some(Geometry::Y),
            "GetW" | "SetW" => Some(Geometry::W),
            "GetH" | "SetH" => Some(Geometry::H),
            _ => None,
        };

        match (name, geometry) {
            (getter, Some(attribute)) if getter.starts_with("Get") => {
                let mut args = split_args(inner, 2);
                if args.is_empty() {
                    return Err(arity_error("1-2", args.len()));
                }
                let default = if args.len() == 2 { args.remove(1) } else { String::new() };
                Ok(MeterCall::Get {
                    attribute,
                    meter: args.remove(0),
                    default,
                })
            }
            (_, Some(attribute)) => {
                let args = split_args(inner, 2);
                let [meter, value] = exactly::<2>(args).map_err(|n| arity_error("2", n))?;
                Ok(MeterCall::Set {
                    attribute,
                    meter,
                    value,
                })
            }
            ("Show" | "Hide", None) => {
                let args = split_args(inner, usize::MAX);
                let [meter] = exactly::<1>(args).map_err(|n| arity_error("1", n))?;
                let visibility = if name == "Show" {
                    Visibility::Show
                } else {
                    Visibility::Hide
                };
                Ok(MeterCall::Toggle { visibility, meter })
            }
            ("SetProperty", None) => {
                let args = split_args(inner, 3);
                let [meter, property, value] =
                    exactly::<3>(args).map_err(|n| arity_error("3", n))?;
                Ok(MeterCall::SetProperty {
                    meter,
                    property,
                    value,
                })
            }
            _ => Err(MeterCallError::UnknownOperation(format!("{PREFIX}{name}"))),
        }
    }

    pub fn operation(&self) -> String {
        let name = match self {
            MeterCall::Get { attribute, .. } => format!("Get{}", attribute.key()),
            MeterCall::Set { attribute, .. } => format!("Set{}", attribute.key()),
            MeterCall::Toggle {
                visibility: Visibility::Show,
                ..
            } => "Show".to_string(),
            MeterCall::Toggle {
                visibility: Visibility::Hide,
                ..
            } => "Hide".to_string(),
            MeterCall::SetProperty { .. } => "SetProperty".to_string(),
        };
        format!("{PREFIX}{name}")
    }

    /// The bang a mutating call sends to the host; `None` for getters.
    pub fn bang(&self) -> Option<String> {
        let (head, meter) = match self {
            MeterCall::Get { .. } => return None,
            MeterCall::Set {
                attribute,
                meter,
                value,
            } => (
                format!(
                    "[!SetOption {meter} {} {}]",
                    attribute.key(),
                    bang_arg(value)
                ),
                meter,
            ),
            MeterCall::Toggle { visibility, meter } => {
                let verb = match visibility {
                    Visibility::Show => "ShowMeter",
                    Visibility::Hide => "HideMeter",
                };
                (format!("[!{verb} {meter}]"), meter)
            }
            MeterCall::SetProperty {
                meter,
                property,
                value,
            } => (
                format!("[!SetOption {meter} {property} {}]", bang_arg(value)),
                meter,
            ),
        };
        Some(format!("{head}[!UpdateMeter {meter}][!Redraw]"))
    }

    fn validate(&self) -> Result<(), MeterCallError> {
        let missing = match self {
            MeterCall::Get { .. } => false,
            MeterCall::Set { meter, value, .. } => meter.is_empty() || value.is_empty(),
            MeterCall::Toggle { meter, .. } => meter.is_empty(),
            MeterCall::SetProperty {
                meter,
                property,
                value,
            } => meter.is_empty() || property.is_empty() || value.is_empty(),
        };
        if missing {
            Err(MeterCallError::EmptyArgument {
                operation: self.operation(),
            })
        } else {
            Ok(())
        }
    }

    /// Run the call against `host`.
    pub fn invoke<H: Host>(&self, host: &H) -> Result<String, MeterCallError> {
        if let MeterCall::Get {
            attribute,
            meter,
            default,
        } = self
        {
            return Ok(read_geometry(host, meter, *attribute, default));
        }

        self.validate()?;
        let Some(bang) = self.bang() else {
            return Ok(FALSE.to_string());
        };
        host.execute(&bang).map_err(|source| MeterCallError::Host {
            operation: self.operation(),
            source,
        })?;
        emit(host, Severity::Debug, &format!("{}: {bang}", self.operation()));
        Ok(TRUE.to_string())
    }
}

fn read_geometry<H: Host>(host: &H, meter: &str, attribute: Geometry, default: &str) -> String {
    if meter.is_empty() {
        return default.to_string();
    }
    let reference = format!("[{meter}:{}]", attribute.key());
    let replaced = host.replace_variables(&reference);
    if replaced.is_empty() || replaced == reference {
        default.to_string()
    } else {
        replaced
    }
}

/// Quote a bang parameter that would otherwise split on whitespace; values
/// carrying a double quote use the host's triple-quote form.
fn bang_arg(value: &str) -> String {
    if value.contains('"') {
        format!("\"\"\"{value}\"\"\"")
    } else if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Split on commas into at most `limit` pieces (the last keeps any further
/// commas), trimming whitespace and surrounding quotes from each.
fn split_args(inner: &str, limit: usize) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner
        .splitn(limit, ',')
        .map(|arg| arg.trim_matches([' ', '\t', '\'', '"']).to_string())
        .collect()
}

fn exactly<const N: usize>(args: Vec<String>) -> Result<[String; N], usize> {
    let found = args.len();
    args.try_into().map_err(|_| found)
}

/// Parse and run `command`, degrading every failure to a log line.
pub fn execute<H: Host>(host: &H, command: &str) -> String {
    let call = match MeterCall::parse(command) {
        Ok(call) => call,
        Err(err) => {
            emit(host, Severity::Error, &err.to_string());
            return FALSE.to_string();
        }
    };
    match call.invoke(host) {
        Ok(result) => result,
        Err(err @ MeterCallError::EmptyArgument { .. }) => {
            emit(host, Severity::Warning, &err.to_string());
            FALSE.to_string()
        }
        Err(err) => {
            emit(host, Severity::Error, &err.to_string());
            FALSE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmnode_core::MemoryHost;

    #[test]
    fn set_x_issues_option_update_and_redraw() {
        let host = MemoryHost::new();
        assert_eq!(execute(&host, "MeterOption.SetX(MyMeter, 100)"), "true");
        assert_eq!(
            host.executed(),
            vec!["[!SetOption MyMeter X 100][!UpdateMeter MyMeter][!Redraw]"]
        );
    }

    #[test]
    fn getter_falls_back_when_host_returns_literal() {
        let host = MemoryHost::new();
        assert_eq!(execute(&host, "MeterOption.GetW(NoSuchMeter, 50)"), "50");
        assert_eq!(execute(&host, "MeterOption.GetW(NoSuchMeter)"), "");
    }

    #[test]
    fn getter_returns_substituted_value() {
        let host = MemoryHost::new().with_variable("Clock:H", "32");
        assert_eq!(execute(&host, "MeterOption.GetH('Clock', 10)"), "32");
        assert!(host.executed().is_empty());
    }

    #[test]
    fn show_and_hide_issue_visibility_bangs() {
        let host = MemoryHost::new();
        assert_eq!(execute(&host, "MeterOption.Hide(\"Panel\")"), "true");
        assert_eq!(execute(&host, "MeterOption.Show(Panel)"), "true");
        assert_eq!(
            host.executed(),
            vec![
                "[!HideMeter Panel][!UpdateMeter Panel][!Redraw]",
                "[!ShowMeter Panel][!UpdateMeter Panel][!Redraw]",
            ]
        );
    }

    #[test]
    fn set_property_value_keeps_commas() {
        let host = MemoryHost::new();
        assert_eq!(
            execute(&host, "MeterOption.SetProperty(Label, FontColor, 255,0,0)"),
            "true"
        );
        assert_eq!(
            host.executed(),
            vec!["[!SetOption Label FontColor 255,0,0][!UpdateMeter Label][!Redraw]"]
        );
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let host = MemoryHost::new();
        execute(&host, "MeterOption.SetProperty(Label, FontColor, 255, 0, 0)");
        execute(&host, "MeterOption.SetProperty(Label, Text, say \"hi\" now)");
        assert_eq!(
            host.executed(),
            vec![
                "[!SetOption Label FontColor \"255, 0, 0\"][!UpdateMeter Label][!Redraw]",
                "[!SetOption Label Text \"\"\"say \"hi\" now\"\"\"][!UpdateMeter Label][!Redraw]",
            ]
        );
    }

    #[test]
    fn empty_setter_arguments_warn_and_fail() {
        let host = MemoryHost::new();
        assert_eq!(execute(&host, "MeterOption.SetY(Clock, )"), "false");
        assert_eq!(execute(&host, "MeterOption.SetY('', 4)"), "false");
        assert!(host.executed().is_empty());
        assert_eq!(host.logs_at(Severity::Warning).len(), 2);
    }

    #[test]
    fn malformed_calls_are_errors() {
        let host = MemoryHost::new();
        assert_eq!(execute(&host, "MeterOption.SetX"), "false");
        assert_eq!(execute(&host, "MeterOption.Explode(Clock)"), "false");
        assert_eq!(execute(&host, "MeterOption.Show(A, B)"), "false");
        assert_eq!(execute(&host, "MeterOption.SetW(Clock)"), "false");
        assert_eq!(host.logs_at(Severity::Error).len(), 4);
    }

    #[test]
    fn host_rejection_is_reported_as_false() {
        let host = MemoryHost::new().rejecting_bangs();
        assert_eq!(execute(&host, "MeterOption.SetH(Clock, 20)"), "false");
        let errors = host.logs_at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("NodeJS: MeterOption.SetH:"));
    }

    #[test]
    fn prefix_detection_ignores_leading_space() {
        assert!(is_meter_call("  MeterOption.GetX(A)"));
        assert!(!is_meter_call("meteroption.GetX(A)"));
        assert!(!is_meter_call("update()"));
    }

    #[test]
    fn every_listed_operation_parses() {
        for (name, params) in OPERATIONS {
            let args: Vec<&str> = params.split(", ").map(|_| "Clock").collect();
            let command = format!("{PREFIX}{name}({})", args.join(", "));
            let call = MeterCall::parse(&command).unwrap();
            assert_eq!(call.operation(), format!("{PREFIX}{name}"));
        }
    }

    #[test]
    fn parse_reports_arity() {
        let err = MeterCall::parse("MeterOption.GetX()").unwrap_err();
        assert!(matches!(err, MeterCallError::Arity { found: 0, .. }));
    }
}
