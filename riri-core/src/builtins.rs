//! Call-site special forms recognized by the C++ emitter.
//!
//! Each entry pairs a trigger with a lowering. The table is ordered and the
//! first matching entry wins, so entries for specific receivers (such as
//! `Math.random`) must come before the general ones (`Math.*`).

use crate::ast::Expr;
use crate::codegen_cpp::{CppEmitter, EmitOptions};
use crate::error::CoreError;

/// A call expression as seen by the special-form table.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub callee: &'a Expr,
    pub args: &'a [Expr],
}

impl<'a> CallSite<'a> {
    /// Name of a plain function call such as `print(x)`.
    pub fn function(&self) -> Option<&'a str> {
        match self.callee {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Method name of a call such as `xs.map(f)`.
    pub fn method(&self) -> Option<&'a str> {
        self.callee.member_name()
    }

    pub fn receiver(&self) -> Option<&'a Expr> {
        match self.callee {
            Expr::Member { object, .. } => Some(object),
            _ => None,
        }
    }

    fn is_function(&self, names: &[&str]) -> bool {
        self.function().is_some_and(|name| names.contains(&name))
    }

    fn is_method(&self, names: &[&str]) -> bool {
        self.method().is_some_and(|name| names.contains(&name))
    }

    /// `namespace.method(...)` where `namespace` is a bare identifier.
    fn is_namespaced(&self, namespace: &str) -> bool {
        self.receiver().is_some_and(|r| r.is_identifier(namespace))
    }
}

type Matcher = fn(&CallSite<'_>, &EmitOptions) -> bool;
type Lowering = fn(&mut CppEmitter<'_>, &CallSite<'_>) -> Result<String, CoreError>;

/// One row of the special-form table.
pub struct SpecialForm {
    /// Name used in diagnostics.
    pub name: &'static str,
    /// Fewest arguments the lowering can express.
    pub min_args: usize,
    pub matches: Matcher,
    pub lower: Lowering,
}

pub const SPECIAL_FORMS: &[SpecialForm] = &[
    // Math namespace
    SpecialForm {
        name: "Math.random",
        min_args: 0,
        matches: |site, _| site.is_namespaced("Math") && site.is_method(&["random"]),
        lower: |_, _| Ok("((double)std::rand() / (RAND_MAX))".to_string()),
    },
    SpecialForm {
        name: "Math.*",
        min_args: 0,
        matches: |site, _| site.is_namespaced("Math"),
        lower: |e, site| {
            let method = site.method().unwrap_or_default();
            Ok(format!("std::{method}({})", e.emit_args(site.args)?))
        },
    },
    // Console and IO
    SpecialForm {
        name: "print",
        min_args: 0,
        matches: |site, _| site.is_function(&["print"]),
        lower: |e, site| {
            let mut parts = Vec::with_capacity(site.args.len());
            for arg in site.args {
                parts.push(e.emit_grouped(arg)?);
            }
            if parts.is_empty() {
                return Ok("std::cout << std::endl".to_string());
            }
            Ok(format!(
                "std::cout << {} << std::endl",
                parts.join(" << \" \" << ")
            ))
        },
    },
    SpecialForm {
        name: "input",
        min_args: 0,
        matches: |site, _| site.is_function(&["input"]),
        lower: |_, _| Ok("_riri_input()".to_string()),
    },
    SpecialForm {
        name: "console.table",
        min_args: 1,
        matches: |site, _| {
            site.is_function(&["tprint"])
                || (site.is_namespaced("console") && site.is_method(&["table"]))
        },
        lower: |e, site| Ok(format!("_riri_tprint({})", e.emit_args(site.args)?)),
    },
    // GUI toolkit
    SpecialForm {
        name: "createList",
        min_args: 0,
        matches: |site, options| options.gui_toolkit && site.is_function(&["createList"]),
        lower: |_, _| Ok("_riri_create_list()".to_string()),
    },
    SpecialForm {
        name: "msgBox",
        min_args: 1,
        matches: |site, options| options.gui_toolkit && site.is_function(&["msgBox"]),
        lower: |e, site| Ok(format!("_riri_msg_box({})", e.emit_expr(&site.args[0])?)),
    },
    // Conversions and std algorithms
    SpecialForm {
        name: "sort",
        min_args: 1,
        matches: |site, _| site.is_function(&["sort"]),
        lower: |e, site| {
            let target = e.emit_grouped(&site.args[0])?;
            Ok(format!("std::sort({target}.begin(), {target}.end())"))
        },
    },
    SpecialForm {
        name: "string/int/float",
        min_args: 1,
        matches: |site, _| site.is_function(&["string", "int", "float"]),
        lower: |e, site| {
            let target = match site.function() {
                Some("string") => "std::to_string",
                Some("int") => "std::stoi",
                _ => "std::stod",
            };
            Ok(format!("{target}({})", e.emit_expr(&site.args[0])?))
        },
    },
    SpecialForm {
        name: "rand",
        min_args: 0,
        matches: |site, _| site.is_function(&["rand"]),
        lower: |_, _| Ok("std::rand()".to_string()),
    },
    SpecialForm {
        name: "delay",
        min_args: 1,
        matches: |site, _| site.is_function(&["delay"]),
        lower: |e, site| Ok(format!("delay({})", e.emit_expr(&site.args[0])?)),
    },
    // GUI list widgets
    SpecialForm {
        name: "list.add",
        min_args: 1,
        matches: |site, options| options.gui_toolkit && site.is_method(&["add"]),
        lower: |e, site| method_helper(e, site, "_riri_list_add", 1),
    },
    SpecialForm {
        name: "list.clear",
        min_args: 0,
        matches: |site, options| options.gui_toolkit && site.is_method(&["clear"]),
        lower: |e, site| method_helper(e, site, "_riri_list_clear", 0),
    },
    // Array helpers
    SpecialForm {
        name: "length",
        min_args: 0,
        matches: |site, _| site.is_method(&["length"]),
        lower: |e, site| e.emit_expr(site.callee),
    },
    SpecialForm {
        name: "map/filter/forEach",
        min_args: 1,
        matches: |site, _| site.is_method(&["map", "filter", "forEach"]),
        lower: |e, site| {
            let helper = format!("_riri_{}", site.method().unwrap_or_default());
            method_helper(e, site, &helper, 1)
        },
    },
    SpecialForm {
        name: "reduce",
        min_args: 2,
        matches: |site, _| site.is_method(&["reduce"]),
        lower: |e, site| method_helper(e, site, "_riri_reduce", 2),
    },
    SpecialForm {
        name: "slice",
        min_args: 1,
        matches: |site, _| site.is_method(&["slice"]),
        lower: |e, site| {
            let object = receiver(e, site)?;
            let start = e.emit_expr(&site.args[0])?;
            let end = match site.args.get(1) {
                Some(end) => e.emit_expr(end)?,
                None => "-1".to_string(),
            };
            Ok(format!("_riri_slice({object}, {start}, {end})"))
        },
    },
    SpecialForm {
        name: "indexOf/includes/concat",
        min_args: 1,
        matches: |site, _| site.is_method(&["indexOf", "includes", "concat"]),
        lower: |e, site| {
            let helper = format!("_riri_{}", site.method().unwrap_or_default());
            method_helper(e, site, &helper, 1)
        },
    },
    SpecialForm {
        name: "join",
        min_args: 0,
        matches: |site, _| site.is_method(&["join"]),
        lower: |e, site| {
            let object = receiver(e, site)?;
            let separator = match site.args.first() {
                Some(sep) => e.emit_expr(sep)?,
                None => "std::string(\",\")".to_string(),
            };
            Ok(format!("_riri_join({object}, {separator})"))
        },
    },
    SpecialForm {
        name: "reverse",
        min_args: 0,
        matches: |site, _| site.is_method(&["reverse"]),
        lower: |e, site| method_helper(e, site, "_riri_reverse", 0),
    },
    // String helpers
    SpecialForm {
        name: "split/startsWith",
        min_args: 1,
        matches: |site, _| site.is_method(&["split", "startsWith"]),
        lower: |e, site| {
            let helper = format!("_riri_{}", site.method().unwrap_or_default());
            method_helper(e, site, &helper, 1)
        },
    },
    SpecialForm {
        name: "toLowerCase/toUpperCase/trim",
        min_args: 0,
        matches: |site, _| site.is_method(&["toLowerCase", "toUpperCase", "trim"]),
        lower: |e, site| {
            let helper = format!("_riri_{}", site.method().unwrap_or_default());
            method_helper(e, site, &helper, 0)
        },
    },
    SpecialForm {
        name: "parseInt/parseFloat",
        min_args: 1,
        matches: |site, _| site.is_method(&["parseInt", "parseFloat"]),
        lower: |e, site| {
            let helper = format!("_riri_{}", site.method().unwrap_or_default());
            Ok(format!("{helper}({})", e.emit_expr(&site.args[0])?))
        },
    },
    // HTTP server
    SpecialForm {
        name: "server.listen",
        min_args: 1,
        matches: |site, _| site.is_method(&["listen"]),
        lower: |e, site| {
            let object = receiver(e, site)?;
            let port = e.emit_expr(&site.args[0])?;
            Ok(format!("({object})->listen(\"0.0.0.0\", {port})"))
        },
    },
    SpecialForm {
        name: "server.route",
        min_args: 2,
        matches: |site, _| site.is_method(&["get", "post", "put", "delete"]) && site.args.len() == 2,
        lower: |e, site| {
            let object = receiver(e, site)?;
            let verb = capitalize(site.method().unwrap_or_default());
            let path = e.emit_expr(&site.args[0])?;
            let handler = e.emit_expr(&site.args[1])?;
            Ok(format!("({object})->{verb}({path}, {handler})"))
        },
    },
    SpecialForm {
        name: "server.use",
        min_args: 1,
        matches: |site, _| site.is_method(&["use"]),
        lower: |e, site| {
            let object = receiver(e, site)?;
            let handler = e.emit_expr(&site.args[0])?;
            Ok(format!("({object})->set_pre_routing_handler({handler})"))
        },
    },
    SpecialForm {
        name: "response.send/json",
        min_args: 1,
        matches: |site, options| options.http_server && site.is_method(&["send", "json"]),
        lower: |e, site| {
            let object = dotted_receiver(e, site)?;
            let body = e.emit_expr(&site.args[0])?;
            let mime = if site.method() == Some("json") {
                "application/json"
            } else {
                "text/plain"
            };
            Ok(format!("{object}.set_content({body}, \"{mime}\")"))
        },
    },
    SpecialForm {
        name: "response.status",
        min_args: 1,
        matches: |site, options| options.http_server && site.is_method(&["status"]),
        lower: |e, site| {
            let object = dotted_receiver(e, site)?;
            Ok(format!("{object}.status = {}", e.emit_expr(&site.args[0])?))
        },
    },
    // push / pop go through overloads that pick vector or pointer receivers
    SpecialForm {
        name: "push",
        min_args: 1,
        matches: |site, _| site.is_method(&["push"]),
        lower: |e, site| method_helper(e, site, "_riri_push", 1),
    },
    SpecialForm {
        name: "pop",
        min_args: 0,
        matches: |site, _| site.is_method(&["pop"]),
        lower: |e, site| method_helper(e, site, "_riri_pop", 0),
    },
    // HTTP request accessors
    SpecialForm {
        name: "request.get_*_value",
        min_args: 1,
        matches: |site, options| {
            options.http_server && site.is_method(&["get_param_value", "get_header_value"])
        },
        lower: value_method_call,
    },
    SpecialForm {
        name: "params.count/find",
        min_args: 1,
        matches: |site, options| {
            options.http_server
                && site.is_method(&["count", "find"])
                && site
                    .receiver()
                    .and_then(Expr::member_name)
                    .is_some_and(|name| name == "params" || name == "query")
        },
        lower: value_method_call,
    },
];

/// First table entry whose trigger matches `site`.
pub fn find_special_form(site: &CallSite<'_>, options: &EmitOptions) -> Option<&'static SpecialForm> {
    SPECIAL_FORMS.iter().find(|form| (form.matches)(site, options))
}

fn receiver(e: &mut CppEmitter<'_>, site: &CallSite<'_>) -> Result<String, CoreError> {
    let object = site
        .receiver()
        .ok_or_else(|| CoreError::Emit("method form without a receiver".to_string()))?;
    e.emit_expr(object)
}

/// Receiver text safe to follow with `.member`.
fn dotted_receiver(e: &mut CppEmitter<'_>, site: &CallSite<'_>) -> Result<String, CoreError> {
    let object = site
        .receiver()
        .ok_or_else(|| CoreError::Emit("method form without a receiver".to_string()))?;
    e.emit_grouped(object)
}

/// `helper(receiver, arg0, .., argN-1)` using exactly `arity` arguments.
fn method_helper(
    e: &mut CppEmitter<'_>,
    site: &CallSite<'_>,
    helper: &str,
    arity: usize,
) -> Result<String, CoreError> {
    let mut parts = vec![receiver(e, site)?];
    for arg in &site.args[..arity] {
        parts.push(e.emit_expr(arg)?);
    }
    Ok(format!("{helper}({})", parts.join(", ")))
}

/// `receiver.method(args)` with value access.
fn value_method_call(e: &mut CppEmitter<'_>, site: &CallSite<'_>) -> Result<String, CoreError> {
    let object = dotted_receiver(e, site)?;
    let method = site.method().unwrap_or_default();
    Ok(format!("{object}.{method}({})", e.emit_args(site.args)?))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
