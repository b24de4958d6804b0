//! Command-line interface for authex
//! This binary parses and evaluates boolean access expressions.
//!
//! Usage:
//!   authex parse `<expr>` [--format `<format>`]              - Print the parsed expression
//!   authex eval `<expr>` [--user `<name>`] [--group `<name>`]  - Evaluate against an identity

use authex::{AccessContext, AccessExpression, Value};
use clap::{Arg, ArgAction, Command};
use serde::Serialize;

fn main() {
    let matches = Command::new("authex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for parsing and evaluating boolean access expressions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("parse")
                .about("Parse an expression and print its structure")
                .arg(
                    Arg::new("expr")
                        .help("The access expression to parse")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format ('tree', 'repr' or 'json')")
                        .default_value("tree"),
                ),
        )
        .subcommand(
            Command::new("eval")
                .about("Evaluate an expression against an identity")
                .arg(
                    Arg::new("expr")
                        .help("The access expression to evaluate")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .short('u')
                        .help("User name of the identity"),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .short('g')
                        .help("Group the identity belongs to (repeatable)")
                        .action(ArgAction::Append),
                ),
        )
        .get_matches();

    // Handle subcommands
    match matches.subcommand() {
        Some(("parse", parse_matches)) => {
            let expr = parse_matches.get_one::<String>("expr").unwrap();
            let format = parse_matches.get_one::<String>("format").unwrap();
            handle_parse_command(expr, format);
        }
        Some(("eval", eval_matches)) => {
            let expr = eval_matches.get_one::<String>("expr").unwrap();
            let user = eval_matches.get_one::<String>("user").cloned();
            let groups: Vec<String> = eval_matches
                .get_many::<String>("group")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            handle_eval_command(expr, user, groups);
        }
        _ => unreachable!(),
    }
}

fn parse_or_exit(expr: &str) -> AccessExpression {
    authex::parse_expression(expr).unwrap_or_else(|e| {
        eprintln!("Parse error: {}", e);
        std::process::exit(1);
    })
}

/// JSON view of a parsed expression.
#[derive(Serialize)]
struct JsonNode {
    element: Option<String>,
    args: Vec<JsonArg>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonArg {
    Token {
        token: String,
        lexeme: String,
        position: usize,
    },
    Node(JsonNode),
}

fn to_json_node(node: &AccessExpression) -> JsonNode {
    JsonNode {
        element: node.definition().map(|d| d.name().to_string()),
        args: node
            .args()
            .iter()
            .map(|arg| match arg {
                authex::engine::Argument::Token(t) => JsonArg::Token {
                    token: t.definition().name().to_string(),
                    lexeme: t.match_text().to_string(),
                    position: t.position(),
                },
                authex::engine::Argument::Element(e) => JsonArg::Node(to_json_node(e)),
            })
            .collect(),
    }
}

/// Handle the parse command
fn handle_parse_command(expr: &str, format: &str) {
    let root = parse_or_exit(expr);
    match format {
        "tree" => {
            let tree = root.tree_string().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            print!("{}", tree);
        }
        "repr" => {
            let repr = root.representation().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            println!("{}", repr);
        }
        "json" => {
            let json = serde_json::to_string_pretty(&to_json_node(&root)).unwrap_or_else(|e| {
                eprintln!("Serialization error: {}", e);
                std::process::exit(1);
            });
            println!("{}", json);
        }
        other => {
            eprintln!("Unknown format '{}'; use 'tree', 'repr' or 'json'", other);
            std::process::exit(1);
        }
    }
}

/// Handle the eval command
fn handle_eval_command(expr: &str, user: Option<String>, groups: Vec<String>) {
    let root = parse_or_exit(expr);
    let mut ctx = AccessContext::new();
    ctx.set_user(user);
    ctx.set_groups(groups);
    match root.evaluate(&ctx) {
        Ok(Value::Bool(granted)) => {
            println!("{}", granted);
            std::process::exit(if granted { 0 } else { 2 });
        }
        Ok(Value::Empty) => {
            eprintln!("Empty expression");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            std::process::exit(1);
        }
    }
}
