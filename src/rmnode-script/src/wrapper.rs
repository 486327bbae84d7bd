//! The JavaScript program handed to the interpreter for one invocation.
//!
//! Layout: prelude (console overrides, `MeterOption` stubs, result emitter),
//! then a `try` block that loads the user's script and runs the requested
//! function or expression. Everything user-supplied is embedded as a JSON
//! string literal, so it can never break out of the wrapper's syntax. The
//! script itself goes through `vm.runInThisContext`; call expressions go
//! through `eval`.

use crate::bridge::{OPERATIONS, PREFIX};
use crate::protocol::{RESULT_PREFIX, SCRIPT_ERROR_PREFIX};
use crate::request::{CommandRequest, ScriptSource};
use rmnode_core::normalize_path;

/// Name inline scripts carry in stack traces and syntax errors.
const INLINE_FILENAME: &str = "inline.js";

const CONSOLE_PRELUDE: &str = r#"const __rmnodeFormat = (args) => args.map((a) => String(a)).join(' ');
console.log = (...args) => { process.stdout.write('LOG: ' + __rmnodeFormat(args) + '\n'); };
console.info = (...args) => { process.stdout.write('LOG: ' + __rmnodeFormat(args) + '\n'); };
console.debug = (...args) => { process.stdout.write('DEBUG: ' + __rmnodeFormat(args) + '\n'); };
console.error = (...args) => { process.stderr.write('ERROR: ' + __rmnodeFormat(args) + '\n'); };
console.warn = (...args) => { process.stderr.write('WARNING: ' + __rmnodeFormat(args) + '\n'); };
"#;

#[derive(Debug, Clone)]
pub struct WrapperScript {
    text: String,
}

impl WrapperScript {
    pub fn build(source: &ScriptSource, request: &CommandRequest) -> Self {
        let mut text = String::with_capacity(2048);
        text.push_str(CONSOLE_PRELUDE);
        text.push_str(&meter_stubs());
        text.push_str(&format!(
            "const __rmnodeEmit = (result) => {{ if (result !== undefined && result !== null) {{ process.stdout.write('{RESULT_PREFIX}' + String(result) + '\\n'); }} }};\n"
        ));

        text.push_str("try {\n");
        text.push_str(&load_statement(source));
        text.push_str(&invoke_statement(request));
        text.push_str(&format!(
            "}} catch (e) {{\n  console.error('{SCRIPT_ERROR_PREFIX}' + ((e && e.message) || String(e)));\n}}\n"
        ));

        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// `global.MeterOption` with one throwing stub per bridge operation, so a
/// script that calls them inline learns where they belong.
fn meter_stubs() -> String {
    let namespace = PREFIX.trim_end_matches('.');
    let members: Vec<String> = OPERATIONS
        .iter()
        .map(|(name, params)| {
            format!(
                "  {name}: function({params}) {{ throw new Error('{PREFIX}{name} should be called via ExecuteBang, not directly in Node.js'); }}"
            )
        })
        .collect();
    format!("global.{namespace} = {{\n{}\n}};\n", members.join(",\n"))
}

/// The user's script runs as a script of its own in the global context, so
/// its top-level `function`, `const`, `let` and `class` declarations are
/// globals the invoke statement can see. `require` is published as a global
/// for it, resolving relative to the script file in file mode.
fn load_statement(source: &ScriptSource) -> String {
    match source {
        ScriptSource::Inline(code) => format!(
            "  globalThis.require = require;\n  require('vm').runInThisContext({}, {{ filename: {} }});\n",
            js_string(code),
            js_string(INLINE_FILENAME)
        ),
        ScriptSource::File(path) => {
            let path = normalize_path(&path.to_string_lossy());
            format!(
                "  const __rmnodeScriptPath = {};\n  if (!require('fs').existsSync(__rmnodeScriptPath)) {{ throw new Error('Script file not found: ' + __rmnodeScriptPath); }}\n  globalThis.require = require('module').createRequire(__rmnodeScriptPath);\n  globalThis.__filename = __rmnodeScriptPath;\n  globalThis.__dirname = require('path').dirname(__rmnodeScriptPath);\n  require('vm').runInThisContext(require('fs').readFileSync(__rmnodeScriptPath, 'utf8'), {{ filename: __rmnodeScriptPath }});\n",
                js_string(&path)
            )
        }
    }
}

fn invoke_statement(request: &CommandRequest) -> String {
    match request {
        CommandRequest::Lifecycle(lifecycle) => {
            let name = lifecycle.function_name();
            format!("  if (typeof {name} === 'function') {{ __rmnodeEmit({name}()); }}\n")
        }
        CommandRequest::Raw(expr) | CommandRequest::Parsed(expr) => {
            format!("  __rmnodeEmit(eval({}));\n", js_string(expr))
        }
    }
}

/// A JSON string literal is a valid JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Lifecycle;
    use std::path::PathBuf;

    fn inline(code: &str) -> ScriptSource {
        ScriptSource::Inline(code.to_string())
    }

    #[test]
    fn prelude_tags_every_console_method() {
        let script = WrapperScript::build(&inline(""), &CommandRequest::Lifecycle(Lifecycle::Update));
        let text = script.as_str();
        for tag in ["'LOG: '", "'DEBUG: '", "'ERROR: '", "'WARNING: '"] {
            assert!(text.contains(tag), "missing {tag}");
        }
        assert!(text.contains("console.warn = (...args) => { process.stderr.write('WARNING: '"));
        assert!(text.contains("console.debug = (...args) => { process.stdout.write('DEBUG: '"));
    }

    #[test]
    fn stubs_cover_every_bridge_operation() {
        let stubs = meter_stubs();
        assert!(stubs.starts_with("global.MeterOption = {"));
        for (name, _) in OPERATIONS {
            assert!(stubs.contains(&format!(
                "'MeterOption.{name} should be called via ExecuteBang, not directly in Node.js'"
            )));
        }
    }

    #[test]
    fn lifecycle_epilogue_guards_on_typeof() {
        let script = WrapperScript::build(
            &inline("function update(){return 42;}"),
            &CommandRequest::Lifecycle(Lifecycle::GetString),
        );
        assert!(script
            .as_str()
            .contains("if (typeof getString === 'function') { __rmnodeEmit(getString()); }"));
        assert!(script.as_str().contains(
            r#"require('vm').runInThisContext("function update(){return 42;}", { filename: "inline.js" });"#
        ));
    }

    #[test]
    fn expressions_are_embedded_as_literals() {
        let script = WrapperScript::build(
            &inline(""),
            &CommandRequest::Parsed(r#"greet("it's", 'x')"#.to_string()),
        );
        assert!(script
            .as_str()
            .contains(r#"__rmnodeEmit(eval("greet(\"it's\", 'x')"));"#));
    }

    #[test]
    fn inline_source_with_newlines_stays_one_literal() {
        let script = WrapperScript::build(
            &inline("var a = 1;\nfunction update() { return a; }"),
            &CommandRequest::Lifecycle(Lifecycle::Update),
        );
        assert!(script
            .as_str()
            .contains(r#"runInThisContext("var a = 1;\nfunction update() { return a; }","#));
    }

    #[test]
    fn file_source_uses_normalized_path() {
        let script = WrapperScript::build(
            &ScriptSource::File(PathBuf::from(r"C:\Skins\Clock\clock.js")),
            &CommandRequest::Lifecycle(Lifecycle::Initialize),
        );
        let text = script.as_str();
        assert!(text.contains(r#"const __rmnodeScriptPath = "C:/Skins/Clock/clock.js";"#));
        assert!(text.contains("createRequire(__rmnodeScriptPath)"));
        assert!(text.contains(
            "runInThisContext(require('fs').readFileSync(__rmnodeScriptPath, 'utf8'), { filename: __rmnodeScriptPath })"
        ));
    }

    #[test]
    fn user_code_runs_inside_try() {
        let text = WrapperScript::build(&inline("boom()"), &CommandRequest::Raw("x()".into()))
            .into_string();
        let try_at = text.find("try {").unwrap();
        let eval_at = text.find("runInThisContext(\"boom()\"").unwrap();
        let catch_at = text.find("} catch (e) {").unwrap();
        assert!(try_at < eval_at && eval_at < catch_at);
        assert!(text.contains("console.error('NodeJS Plugin Error: '"));
    }
}
