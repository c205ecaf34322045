//! Syntax-directed translation from the RiriLang AST to C++20.
//!
//! Output layout:
//!
//!   prelude (headers + runtime helpers)
//!   class structs and top-level functions, in source order
//!   `int main(...)` holding every other top-level statement
//!
//! Every decision is a local pattern match on the node being emitted and
//! its direct children; there is no type analysis.

use tracing::debug;

use crate::ast::{ArrowBody, CatchClause, ClassDecl, Expr, FunctionDecl, Program, Property, Stmt};
use crate::builtins::{CallSite, find_special_form};
use crate::error::CoreError;
use crate::prelude::prelude;
use crate::receiver::{ReceiverShape, classify_receiver};

const INDENT: &str = "    ";

/// Optional target features. Both are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Emit the Qt DOM-like support block and a `QApplication` entry point.
    pub gui_toolkit: bool,
    /// Emit `httplib` support and request/response sugar.
    pub http_server: bool,
}

/// Emit a complete C++ translation unit for `program`.
pub fn emit(program: &Program, options: &EmitOptions) -> Result<String, CoreError> {
    let mut emitter = CppEmitter::new(options);
    let cpp = emitter.emit_program(program)?;
    debug!(bytes = cpp.len(), "emitted C++");
    Ok(cpp)
}

pub struct CppEmitter<'o> {
    options: &'o EmitOptions,
    indent: usize,
}

impl<'o> CppEmitter<'o> {
    pub fn new(options: &'o EmitOptions) -> Self {
        Self { options, indent: 0 }
    }

    fn emit_program(&mut self, program: &Program) -> Result<String, CoreError> {
        let mut out = prelude(self.options);
        out.push('\n');

        let mut entry = Vec::new();
        for stmt in &program.body {
            match stmt {
                Stmt::ClassDeclaration(class) => {
                    self.emit_class(class, &mut out)?;
                    out.push('\n');
                }
                Stmt::FunctionDeclaration(func) => {
                    self.emit_free_function(func, &mut out)?;
                    out.push('\n');
                }
                other => entry.push(other),
            }
        }

        out.push_str("int main(int argc, char *argv[]) {\n");
        self.indent = 1;
        if self.options.gui_toolkit {
            self.line(&mut out, "QApplication app(argc, argv);");
            self.line(&mut out, "Document document;");
        } else {
            self.line(&mut out, "std::srand(std::time(0));");
        }
        for stmt in entry {
            self.emit_stmt(stmt, &mut out)?;
        }
        if self.options.gui_toolkit {
            self.line(&mut out, "return app.exec();");
        } else {
            self.line(&mut out, "return 0;");
        }
        self.indent = 0;
        out.push_str("}\n");
        Ok(out)
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt, out: &mut String) -> Result<(), CoreError> {
        match stmt {
            Stmt::VariableDeclaration { name, value } => {
                let text = self.emit_declaration(name, value.as_ref())?;
                self.line(out, &format!("{text};"));
            }
            Stmt::FunctionDeclaration(func) => {
                let header = format!(
                    "auto {} = [&]({}) {{",
                    binding(&func.name),
                    params(&func.params)
                );
                self.line(out, &header);
                self.emit_block(&func.body, out)?;
                self.line(out, "};");
            }
            Stmt::ClassDeclaration(class) => self.emit_class(class, out)?,
            Stmt::Import { path } => self.line(out, &format!("// import \"{path}\"")),
            Stmt::Return(None) => self.line(out, "return;"),
            Stmt::Return(Some(value)) => {
                let value = self.emit_expr(value)?;
                self.line(out, &format!("return {value};"));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.emit_if(condition, then_branch, else_branch.as_deref(), out)?,
            Stmt::While { condition, body } => {
                let condition = self.emit_expr(condition)?;
                self.line(out, &format!("while ({condition}) {{"));
                self.emit_block(body, out)?;
                self.line(out, "}");
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                let init = match init.as_deref() {
                    None => String::new(),
                    Some(Stmt::VariableDeclaration { name, value }) => {
                        self.emit_declaration(name, value.as_ref())?
                    }
                    Some(Stmt::Expression(expr)) => self.emit_expr(expr)?,
                    Some(_) => {
                        return Err(CoreError::Emit(
                            "for-loop initializer must be a declaration or expression".to_string(),
                        ));
                    }
                };
                let condition = self.emit_optional(condition.as_ref())?;
                let update = self.emit_optional(update.as_ref())?;
                self.line(out, &format!("for ({init}; {condition}; {update}) {{"));
                self.emit_block(body, out)?;
                self.line(out, "}");
            }
            Stmt::Switch {
                discriminant,
                cases,
                default,
            } => {
                let discriminant = self.emit_expr(discriminant)?;
                self.line(out, &format!("switch ({discriminant}) {{"));
                self.indent += 1;
                // No implicit `break`: clauses fall through as written.
                for case in cases {
                    let test = self.emit_expr(&case.test)?;
                    self.line(out, &format!("case {test}: {{"));
                    self.emit_block(&case.body, out)?;
                    self.line(out, "}");
                }
                if let Some(default) = default {
                    self.line(out, "default: {");
                    self.emit_block(default, out)?;
                    self.line(out, "}");
                }
                self.indent -= 1;
                self.line(out, "}");
            }
            Stmt::Break => self.line(out, "break;"),
            Stmt::Continue => self.line(out, "continue;"),
            Stmt::Try {
                body,
                catch,
                finally_body,
            } => self.emit_try(body, catch.as_ref(), finally_body.as_deref(), out)?,
            Stmt::Expression(expr) => {
                let expr = self.emit_expr(expr)?;
                self.line(out, &format!("{expr};"));
            }
        }
        Ok(())
    }

    /// `else if` chains nest one `else` block per arm. The chain is walked
    /// with a loop so its length is not bounded by the call stack.
    fn emit_if<'a>(
        &mut self,
        mut condition: &'a Expr,
        mut then_branch: &'a [Stmt],
        mut else_branch: Option<&'a [Stmt]>,
        out: &mut String,
    ) -> Result<(), CoreError> {
        let mut open_arms = 0;
        loop {
            let text = self.emit_expr(condition)?;
            self.line(out, &format!("if ({text}) {{"));
            self.emit_block(then_branch, out)?;
            match else_branch {
                Some(
                    [
                        Stmt::If {
                            condition: next_condition,
                            then_branch: next_then,
                            else_branch: next_else,
                        },
                    ],
                ) => {
                    self.line(out, "} else {");
                    self.indent += 1;
                    open_arms += 1;
                    condition = next_condition;
                    then_branch = next_then.as_slice();
                    else_branch = next_else.as_deref();
                }
                Some(stmts) => {
                    self.line(out, "} else {");
                    self.emit_block(stmts, out)?;
                    self.line(out, "}");
                    break;
                }
                None => {
                    self.line(out, "}");
                    break;
                }
            }
        }
        for _ in 0..open_arms {
            self.indent -= 1;
            self.line(out, "}");
        }
        Ok(())
    }

    fn emit_declaration(&mut self, name: &str, value: Option<&Expr>) -> Result<String, CoreError> {
        Ok(match value {
            Some(value) => format!("auto {} = {}", binding(name), self.emit_expr(value)?),
            None => format!("int {}", binding(name)),
        })
    }

    /// `finally` runs after the try/catch, not on early return.
    fn emit_try(
        &mut self,
        body: &[Stmt],
        catch: Option<&CatchClause>,
        finally_body: Option<&[Stmt]>,
        out: &mut String,
    ) -> Result<(), CoreError> {
        self.line(out, "try {");
        self.emit_block(body, out)?;
        match catch {
            Some(CatchClause {
                param: Some(param),
                body,
            }) => {
                self.line(out, "} catch (const std::exception& _e) {");
                self.indent += 1;
                self.line(out, &format!("std::string {} = _e.what();", binding(param)));
                self.indent -= 1;
                self.emit_block(body, out)?;
            }
            Some(CatchClause { param: None, body }) => {
                self.line(out, "} catch (...) {");
                self.emit_block(body, out)?;
            }
            None => {
                self.line(out, "} catch (...) {");
                self.indent += 1;
                self.line(out, "throw;");
                self.indent -= 1;
            }
        }
        self.line(out, "}");

        if let Some(finally_body) = finally_body {
            self.line(out, "{");
            self.indent += 1;
            self.line(out, "// finally");
            self.indent -= 1;
            self.emit_block(finally_body, out)?;
            self.line(out, "}");
        }
        Ok(())
    }

    fn emit_free_function(&mut self, func: &FunctionDecl, out: &mut String) -> Result<(), CoreError> {
        let header = format!("auto {}({}) {{", binding(&func.name), params(&func.params));
        self.line(out, &header);
        self.emit_block(&func.body, out)?;
        self.line(out, "}");
        Ok(())
    }

    fn emit_class(&mut self, class: &ClassDecl, out: &mut String) -> Result<(), CoreError> {
        self.line(out, &format!("struct {} {{", class.name));
        self.indent += 1;
        for field in &class.fields {
            match &field.value {
                Some(value) => {
                    let init = self.emit_expr(value)?;
                    let ty = field_type(value);
                    self.line(out, &format!("{ty} {} = {init};", field.name));
                }
                None => self.line(out, &format!("int {};", field.name)),
            }
        }
        for method in &class.methods {
            let header = format!("auto {}({}) {{", method.name, params(&method.params));
            self.line(out, &header);
            self.emit_block(&method.body, out)?;
            self.line(out, "}");
        }
        self.indent -= 1;
        self.line(out, "};");
        Ok(())
    }

    fn emit_block(&mut self, stmts: &[Stmt], out: &mut String) -> Result<(), CoreError> {
        self.indent += 1;
        for stmt in stmts {
            self.emit_stmt(stmt, out)?;
        }
        self.indent -= 1;
        Ok(())
    }

    fn line(&self, out: &mut String, text: &str) {
        for _ in 0..self.indent {
            out.push_str(INDENT);
        }
        out.push_str(text);
        out.push('\n');
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    pub fn emit_expr(&mut self, expr: &Expr) -> Result<String, CoreError> {
        Ok(match expr {
            Expr::Assignment { target, value } => {
                format!("{} = {}", self.emit_expr(target)?, self.emit_expr(value)?)
            }
            Expr::Binary { op, left, right } => {
                let left = self.emit_operand(left, op.precedence(), false)?;
                let right = self.emit_operand(right, op.precedence(), true)?;
                format!("{left} {} {right}", op.symbol())
            }
            Expr::Unary { operand } => format!("(-{})", self.emit_grouped(operand)?),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => format!(
                "({} ? {} : {})",
                self.emit_expr(test)?,
                self.emit_expr(consequent)?,
                self.emit_expr(alternate)?
            ),
            Expr::Call { callee, args } => self.emit_call(callee, args)?,
            Expr::Member { object, property } => self.emit_member(object, property)?,
            Expr::New { class_name, args } => {
                if class_name == "Server" {
                    "std::make_shared<httplib::Server>()".to_string()
                } else {
                    format!("std::make_shared<{class_name}>({})", self.emit_args(args)?)
                }
            }
            Expr::Array(elements) => self.emit_array(elements)?,
            Expr::Identifier(name) => reference(name).to_string(),
            Expr::Number(value) => format_number(*value),
            Expr::StringLiteral(text) => format!("std::string(\"{text}\")"),
            Expr::This => "this".to_string(),
            Expr::Await(inner) => format!("await_result({})", self.emit_expr(inner)?),
            Expr::ArrowFunction { params, body } => self.emit_arrow(params, body)?,
        })
    }

    /// Comma-separated arguments.
    pub fn emit_args(&mut self, args: &[Expr]) -> Result<String, CoreError> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.emit_expr(arg)?);
        }
        Ok(parts.join(", "))
    }

    /// Like [`emit_expr`](Self::emit_expr) but parenthesizes binary and
    /// assignment expressions. Used wherever the text is glued to a tighter
    /// operator: `<<`, unary minus, `.member`, `[index]`.
    pub fn emit_grouped(&mut self, expr: &Expr) -> Result<String, CoreError> {
        let text = self.emit_expr(expr)?;
        Ok(group(expr, text))
    }

    fn emit_operand(&mut self, expr: &Expr, parent: u8, right: bool) -> Result<String, CoreError> {
        let text = self.emit_expr(expr)?;
        let grouped = match expr {
            Expr::Binary { op, .. } => {
                op.precedence() < parent || (right && op.precedence() == parent)
            }
            Expr::Assignment { .. } => true,
            _ => false,
        };
        Ok(if grouped { format!("({text})") } else { text })
    }

    fn emit_optional(&mut self, expr: Option<&Expr>) -> Result<String, CoreError> {
        match expr {
            Some(expr) => self.emit_expr(expr),
            None => Ok(String::new()),
        }
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<String, CoreError> {
        let site = CallSite { callee, args };
        if let Some(form) = find_special_form(&site, self.options) {
            if args.len() < form.min_args {
                return Err(CoreError::Emit(format!(
                    "`{}` expects at least {} argument(s), got {}",
                    form.name,
                    form.min_args,
                    args.len()
                )));
            }
            return (form.lower)(self, &site);
        }
        Ok(format!("{}({})", self.emit_expr(callee)?, self.emit_args(args)?))
    }

    fn emit_member(&mut self, object: &Expr, property: &Property) -> Result<String, CoreError> {
        let text = self.emit_expr(object)?;
        let target = group(object, text.clone());
        let http = self.options.http_server;

        let name = match property {
            Property::Computed(index) => {
                let index = self.emit_expr(index)?;
                return Ok(match object.member_name() {
                    Some("params") if http => format!("_riri_get_param({target}, {index})"),
                    Some("query") if http => format!("_riri_get_query({target}, {index})"),
                    _ => format!("{target}[{index}]"),
                });
            }
            Property::Named(name) => name.as_str(),
        };

        if http && name == "params" {
            return Ok(format!("{target}.path_params"));
        }
        if http && name == "query" {
            return Ok(format!("{target}.params"));
        }
        Ok(match classify_receiver(object, name, self.options) {
            ReceiverShape::ValueAggregate if name == "length" => format!("{target}.size()"),
            ReceiverShape::ValueAggregate => format!("{target}.{name}"),
            ReceiverShape::ReferenceAggregate | ReceiverShape::Unknown => {
                format!("({text})->{name}")
            }
        })
    }

    fn emit_array(&mut self, elements: &[Expr]) -> Result<String, CoreError> {
        let items = self.emit_args(elements)?;
        let ty = array_element_type(elements);
        Ok(format!("std::vector<{ty}>{{{items}}}"))
    }

    fn emit_arrow(&mut self, params: &[String], body: &ArrowBody) -> Result<String, CoreError> {
        let http = self.options.http_server;
        let middleware = http && params.iter().any(|p| p == "next");
        let params: Vec<String> = params
            .iter()
            .filter(|p| !(http && *p == "next"))
            .map(|p| match p.as_str() {
                "req" if http => "const httplib::Request& req".to_string(),
                "res" if http => "httplib::Response& res".to_string(),
                _ => format!("auto {}", binding(p)),
            })
            .collect();

        let mut out = format!("[&]({}) {{\n", params.join(", "));
        self.indent += 1;
        match body {
            ArrowBody::Block(stmts) => {
                for stmt in stmts {
                    self.emit_stmt(stmt, &mut out)?;
                }
            }
            ArrowBody::Expr(expr) => {
                let value = self.emit_expr(expr)?;
                self.line(&mut out, &format!("return {value};"));
            }
        }
        if middleware {
            self.line(&mut out, "return httplib::Server::HandlerResponse::Unhandled;");
        }
        self.indent -= 1;
        for _ in 0..self.indent {
            out.push_str(INDENT);
        }
        out.push('}');
        Ok(out)
    }
}

fn group(expr: &Expr, text: String) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assignment { .. } => format!("({text})"),
        _ => text,
    }
}

/// Name used where a binding is introduced.
fn binding(name: &str) -> &str {
    if name == "main" { "riri_main" } else { name }
}

/// Name used where a binding is referenced.
fn reference(name: &str) -> &str {
    match name {
        "null" => "nullptr",
        other => binding(other),
    }
}

fn params(params: &[String]) -> String {
    params
        .iter()
        .map(|p| format!("auto {}", binding(p)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_number(value: f64) -> String {
    format!("{value}")
}

/// Element type from the first element only: a string literal gives
/// `std::string`, anything else (including `[]`) the numeric default.
fn array_element_type(elements: &[Expr]) -> &'static str {
    match elements.first() {
        Some(Expr::StringLiteral(_)) => "std::string",
        _ => "int",
    }
}

fn numeric_literal(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Number(value) => Some(*value),
        Expr::Unary { operand } => numeric_literal(operand).map(|value| -value),
        _ => None,
    }
}

/// C++ type of a class field, guessed from its initializer.
fn field_type(value: &Expr) -> String {
    match value {
        Expr::StringLiteral(_) => "std::string".to_string(),
        Expr::Array(elements) => format!("std::vector<{}>", array_element_type(elements)),
        Expr::New { class_name, .. } if class_name == "Server" => {
            "std::shared_ptr<httplib::Server>".to_string()
        }
        Expr::New { class_name, .. } => format!("std::shared_ptr<{class_name}>"),
        Expr::Identifier(name) if name == "true" || name == "false" => "bool".to_string(),
        other => match numeric_literal(other) {
            Some(value) if value.fract() != 0.0 => "double".to_string(),
            _ => "int".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn emit_with(source: &str, options: EmitOptions) -> String {
        let program = parse_source(source).expect("parse");
        emit(&program, &options).expect("emit")
    }

    /// Just the generated program, without the prelude.
    fn body(source: &str) -> String {
        body_with(source, EmitOptions::default())
    }

    fn body_with(source: &str, options: EmitOptions) -> String {
        let full = emit_with(source, options);
        full[prelude(&options).len()..].to_string()
    }

    fn expr(source: &str) -> String {
        let program = parse_source(&format!("{source};")).expect("parse");
        let Some(Stmt::Expression(expr)) = program.body.first() else {
            panic!("expected expression statement");
        };
        CppEmitter::new(&EmitOptions::default())
            .emit_expr(expr)
            .expect("emit")
    }

    fn http_expr(source: &str) -> String {
        let program = parse_source(&format!("{source};")).expect("parse");
        let Some(Stmt::Expression(expr)) = program.body.first() else {
            panic!("expected expression statement");
        };
        let options = EmitOptions {
            http_server: true,
            ..EmitOptions::default()
        };
        CppEmitter::new(&options).emit_expr(expr).expect("emit")
    }

    #[test]
    fn emits_entry_point_with_statements() {
        assert_eq!(
            body("let x = 1 + 2 * 3;"),
            "\nint main(int argc, char *argv[]) {\n    std::srand(std::time(0));\n    auto x = 1 + 2 * 3;\n    return 0;\n}\n"
        );
    }

    #[test]
    fn preserves_grouping_with_parentheses() {
        assert_eq!(expr("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(expr("1 - (2 - 3)"), "1 - (2 - 3)");
        assert_eq!(expr("1 - 2 - 3"), "1 - 2 - 3");
        assert_eq!(expr("a && (b || c)"), "a && (b || c)");
        assert_eq!(expr("-x * 2"), "(-x) * 2");
    }

    #[test]
    fn grouped_operands_survive_tighter_operators() {
        assert_eq!(expr("-(a + b)"), "(-(a + b))");
        assert_eq!(expr("(s + t).length"), "(s + t).size()");
        assert_eq!(expr("(a + b)[0]"), "(a + b)[0]");
        assert_eq!(expr("(a + b).substr(0, 1)"), "(a + b).substr(0, 1)");
        assert_eq!(expr("(a + b).x"), "(a + b)->x");
        assert_eq!(expr("sort(a = b)"), "std::sort((a = b).begin(), (a = b).end())");
        assert_eq!(
            http_expr("(a + b).send(\"x\")"),
            "(a + b).set_content(std::string(\"x\"), \"text/plain\")"
        );
        assert_eq!(http_expr("(a + b).status(1)"), "(a + b).status = 1");
    }

    #[test]
    fn equality_and_relational_keep_left_to_right_grouping() {
        assert_eq!(expr("a == b < c"), "(a == b) < c");
        assert_eq!(expr("a < b == c"), "a < b == c");
        assert_eq!(expr("a == (b < c)"), "a == b < c");
        assert_eq!(expr("a != b != c"), "a != b != c");
    }

    #[test]
    fn functions_precede_main() {
        let out = body("print(add(1, 2));\nfunc add(a, b) { return a + b; }");
        let func = out.find("auto add(auto a, auto b) {").expect("function");
        let main = out.find("int main").expect("main");
        assert!(func < main);
        assert!(out.contains("    return a + b;\n}"));
        assert!(out.contains("std::cout << add(1, 2) << std::endl;"));
    }

    #[test]
    fn nested_functions_become_closures() {
        let out = body("func outer() { func inner(x) { return x; } return inner(1); }");
        assert!(out.contains("    auto inner = [&](auto x) {\n        return x;\n    };\n"));
    }

    #[test]
    fn main_is_renamed() {
        let out = body("func main() { return 0; }\nmain();");
        assert!(out.contains("auto riri_main() {"));
        assert!(out.contains("    riri_main();\n"));
    }

    #[test]
    fn uninitialized_let_defaults_to_int() {
        assert!(body("let n;").contains("    int n;\n"));
    }

    #[test]
    fn literals() {
        assert_eq!(expr("3.14"), "3.14");
        assert_eq!(expr("7"), "7");
        assert_eq!(expr("\"hi\\n\""), "std::string(\"hi\\n\")");
        assert_eq!(expr("null"), "nullptr");
        assert_eq!(expr("[]"), "std::vector<int>{}");
        assert_eq!(expr("[1, 2]"), "std::vector<int>{1, 2}");
        assert_eq!(expr("[1, 2.5]"), "std::vector<int>{1, 2.5}");
        assert_eq!(expr("[x, \"a\"]"), "std::vector<int>{x, std::string(\"a\")}");
        assert_eq!(
            expr("[\"a\", \"b\"]"),
            "std::vector<std::string>{std::string(\"a\"), std::string(\"b\")}"
        );
        assert_eq!(
            expr("[[1], [2]]"),
            "std::vector<int>{std::vector<int>{1}, std::vector<int>{2}}"
        );
    }

    #[test]
    fn if_else_chains_nest() {
        let out = body("if (a) { x = 1; } else if (b) { x = 2; } else { x = 3; }");
        let expected = "    if (a) {\n        x = 1;\n    } else {\n        if (b) {\n            x = 2;\n        } else {\n            x = 3;\n        }\n    }\n";
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn long_else_if_chain_emits_every_arm() {
        let mut source = String::from("if (x == 0) { y = 0; }");
        for arm in 1..200 {
            source.push_str(&format!(" else if (x == {arm}) {{ y = {arm}; }}"));
        }
        source.push_str(" else { y = 1000; }");

        let out = body(&source);
        assert_eq!(out.matches("if (x == ").count(), 200);
        assert_eq!(out.matches("} else {").count(), 200);
        assert!(out.contains("if (x == 199) {"));
        assert!(out.contains("y = 1000;"));
        assert_eq!(out.matches('{').count(), out.matches('}').count());
    }

    #[test]
    fn switch_keeps_fallthrough() {
        let out = body("switch (x) { case 1: print(1); case 2: print(2); default: print(0); }");
        let expected = "    switch (x) {\n        case 1: {\n            std::cout << 1 << std::endl;\n        }\n        case 2: {\n            std::cout << 2 << std::endl;\n        }\n        default: {\n            std::cout << 0 << std::endl;\n        }\n    }\n";
        assert!(out.contains(expected), "{out}");
        assert!(!out.contains("break;"));
    }

    #[test]
    fn for_loop_header() {
        let out = body("for (let i = 0; i < 3; i = i + 1) { continue; }");
        assert!(out.contains("    for (auto i = 0; i < 3; i = i + 1) {\n        continue;\n    }\n"));
        let out = body("for (;;) { break; }");
        assert!(out.contains("    for (; ; ) {\n"));
    }

    #[test]
    fn try_catch_finally_appends_finally() {
        let out = body("try { risky(); } catch (e) { print(e); } finally { done(); }");
        let expected = "    try {\n        risky();\n    } catch (const std::exception& _e) {\n        std::string e = _e.what();\n        std::cout << e << std::endl;\n    }\n    {\n        // finally\n        done();\n    }\n";
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn try_without_catch_rethrows() {
        let out = body("try { risky(); } finally { done(); }");
        assert!(out.contains("    } catch (...) {\n        throw;\n    }\n"));
    }

    #[test]
    fn classes_become_structs() {
        let source = r#"
            class Counter {
                let count = 0;
                let ratio = 0.5;
                let name = "c";
                let tags = ["a"];
                let child = new Counter();
                let on = true;
                let raw;
                func inc(step) { this.count = this.count + step; }
            }
            let c = new Counter();
            c.inc(2);
        "#;
        let out = body(source);
        let expected = "struct Counter {\n    int count = 0;\n    double ratio = 0.5;\n    std::string name = std::string(\"c\");\n    std::vector<std::string> tags = std::vector<std::string>{std::string(\"a\")};\n    std::shared_ptr<Counter> child = std::make_shared<Counter>();\n    bool on = true;\n    int raw;\n    auto inc(auto step) {\n        (this)->count = (this)->count + step;\n    }\n};\n";
        assert!(out.starts_with(&format!("\n{expected}")), "{out}");
        assert!(out.contains("    auto c = std::make_shared<Counter>();\n    (c)->inc(2);\n"));
    }

    #[test]
    fn member_access_follows_receiver_shape() {
        assert_eq!(expr("xs.length"), "xs.size()");
        assert_eq!(expr("xs.length()"), "xs.size()");
        assert_eq!(expr("s.substr(0, 2)"), "s.substr(0, 2)");
        assert_eq!(expr("p.x"), "(p)->x");
        assert_eq!(expr("xs[i + 1]"), "xs[i + 1]");
        assert_eq!(expr("h.push"), "(h)->push");
    }

    #[test]
    fn call_special_forms() {
        assert_eq!(expr("Math.random()"), "((double)std::rand() / (RAND_MAX))");
        assert_eq!(expr("Math.floor(x)"), "std::floor(x)");
        assert_eq!(
            expr("print(\"a\", b < c)"),
            "std::cout << std::string(\"a\") << \" \" << (b < c) << std::endl"
        );
        assert_eq!(expr("print()"), "std::cout << std::endl");
        assert_eq!(expr("input()"), "_riri_input()");
        assert_eq!(expr("console.table(xs)"), "_riri_tprint(xs)");
        assert_eq!(expr("tprint(xs)"), "_riri_tprint(xs)");
        assert_eq!(expr("sort(xs)"), "std::sort(xs.begin(), xs.end())");
        assert_eq!(expr("string(1)"), "std::to_string(1)");
        assert_eq!(expr("int(s)"), "std::stoi(s)");
        assert_eq!(expr("float(s)"), "std::stod(s)");
        assert_eq!(expr("rand()"), "std::rand()");
        assert_eq!(expr("delay(10)"), "delay(10)");
        assert_eq!(expr("xs.map((x) => x * 2)"), "_riri_map(xs, [&](auto x) {\n    return x * 2;\n})");
        assert_eq!(expr("xs.filter(f)"), "_riri_filter(xs, f)");
        assert_eq!(expr("xs.forEach(f)"), "_riri_forEach(xs, f)");
        assert_eq!(expr("xs.reduce(f, 0)"), "_riri_reduce(xs, f, 0)");
        assert_eq!(expr("xs.slice(1)"), "_riri_slice(xs, 1, -1)");
        assert_eq!(expr("xs.slice(1, 2)"), "_riri_slice(xs, 1, 2)");
        assert_eq!(expr("xs.indexOf(3)"), "_riri_indexOf(xs, 3)");
        assert_eq!(expr("xs.includes(3)"), "_riri_includes(xs, 3)");
        assert_eq!(expr("xs.concat(ys)"), "_riri_concat(xs, ys)");
        assert_eq!(expr("xs.join()"), "_riri_join(xs, std::string(\",\"))");
        assert_eq!(expr("xs.join(\"-\")"), "_riri_join(xs, std::string(\"-\"))");
        assert_eq!(expr("xs.reverse()"), "_riri_reverse(xs)");
        assert_eq!(expr("s.split(\",\")"), "_riri_split(s, std::string(\",\"))");
        assert_eq!(expr("s.toLowerCase()"), "_riri_toLowerCase(s)");
        assert_eq!(expr("s.toUpperCase()"), "_riri_toUpperCase(s)");
        assert_eq!(expr("s.trim()"), "_riri_trim(s)");
        assert_eq!(expr("s.startsWith(p)"), "_riri_startsWith(s, p)");
        assert_eq!(expr("Number.parseInt(s)"), "_riri_parseInt(s)");
        assert_eq!(expr("Number.parseFloat(s)"), "_riri_parseFloat(s)");
        assert_eq!(expr("xs.push(1)"), "_riri_push(xs, 1)");
        assert_eq!(expr("xs.pop()"), "_riri_pop(xs)");
    }

    #[test]
    fn server_forms() {
        assert_eq!(
            expr("app.get(\"/\", handler)"),
            "(app)->Get(std::string(\"/\"), handler)"
        );
        assert_eq!(expr("app.delete(p, h)"), "(app)->Delete(p, h)");
        assert_eq!(expr("app.listen(8080)"), "(app)->listen(\"0.0.0.0\", 8080)");
        assert_eq!(expr("app.use(mw)"), "(app)->set_pre_routing_handler(mw)");
        assert_eq!(expr("new Server()"), "std::make_shared<httplib::Server>()");
        assert_eq!(expr("cache.get(k)"), "(cache)->get(k)");
    }

    #[test]
    fn http_request_and_response_sugar() {
        assert_eq!(http_expr("res.send(\"ok\")"), "res.set_content(std::string(\"ok\"), \"text/plain\")");
        assert_eq!(http_expr("res.json(body)"), "res.set_content(body, \"application/json\")");
        assert_eq!(http_expr("res.status(404)"), "res.status = 404");
        assert_eq!(http_expr("req.params[\"id\"]"), "_riri_get_param(req.path_params, std::string(\"id\"))");
        assert_eq!(http_expr("req.query[\"q\"]"), "_riri_get_query(req.params, std::string(\"q\"))");
        assert_eq!(http_expr("req.body"), "req.body");
        assert_eq!(http_expr("req.get_header_value(\"Host\")"), "req.get_header_value(std::string(\"Host\"))");
        assert_eq!(http_expr("req.query.count(k)"), "req.params.count(k)");
        assert_eq!(
            http_expr("(req, res) => res.send(\"hi\")"),
            "[&](const httplib::Request& req, httplib::Response& res) {\n    return res.set_content(std::string(\"hi\"), \"text/plain\");\n}"
        );
        assert_eq!(
            http_expr("(req, res, next) => { print(1); }"),
            "[&](const httplib::Request& req, httplib::Response& res) {\n    std::cout << 1 << std::endl;\n    return httplib::Server::HandlerResponse::Unhandled;\n}"
        );
    }

    #[test]
    fn await_wraps_value() {
        assert_eq!(expr("await async_task(f)"), "await_result(async_task(f))");
        assert_eq!(expr("await job"), "await_result(job)");
    }

    #[test]
    fn gui_entry_point() {
        let options = EmitOptions {
            gui_toolkit: true,
            ..EmitOptions::default()
        };
        let out = body_with("let w = document.createElement(\"window\");\nw.show();", options);
        assert!(out.contains("    QApplication app(argc, argv);\n    Document document;\n"));
        assert!(out.contains("    auto w = document.createElement(std::string(\"window\"));\n"));
        assert!(out.contains("    (w)->show();\n"));
        assert!(out.ends_with("    return app.exec();\n}\n"));
    }

    #[test]
    fn unresolved_import_becomes_comment() {
        assert!(body("import \"lib.rr\";").contains("    // import \"lib.rr\"\n"));
    }

    #[test]
    fn special_form_arity_is_checked() {
        let program = parse_source("xs.reduce(f);").expect("parse");
        let err = emit(&program, &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Emit(ref msg) if msg.contains("reduce")));
    }

    #[test]
    fn emission_is_deterministic() {
        let source = "class P { let x = 1; } func f(a) { return a; } let p = new P(); print(f(p.x));";
        let program = parse_source(source).expect("parse");
        let options = EmitOptions::default();
        assert_eq!(
            emit(&program, &options).expect("emit"),
            emit(&program, &options).expect("emit")
        );
    }

    #[test]
    fn every_runtime_helper_used_is_defined() {
        let source = r#"
            let xs = [3, 1, 2];
            xs.push(4); xs.pop();
            print(xs.map((x) => x + 1).filter((x) => x > 1).slice(0, 2).join(","));
            xs.forEach((x, i) => print(x, i));
            print(xs.reduce((a, b) => a + b, 0), xs.indexOf(1), xs.includes(2));
            print(xs.concat(xs).reverse().length);
            let s = input().trim().toLowerCase().toUpperCase();
            print(s.split(" "), s.startsWith("A"), Number.parseInt("1"), Number.parseFloat("2.5"));
            tprint(xs);
            let t = await async_task(() => 1);
            delay(1);
        "#;
        let options = EmitOptions::default();
        let out = body(source);
        let mut rest = out.as_str();
        while let Some(at) = rest.find("_riri_") {
            let tail = &rest[at..];
            let end = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            let name = &tail[..end];
            assert!(crate::prelude::defines(&options, name), "{name} is not defined");
            rest = &tail[end..];
        }
        assert!(crate::prelude::defines(&options, "await_result"));
        assert!(crate::prelude::defines(&options, "async_task"));
    }
}
