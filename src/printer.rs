use crate::types::MalType;

fn escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '"' => "\\\"".to_string(),
            '\n' => "\\n".to_string(),
            '\\' => "\\\\".to_string(),
            _ => c.to_string(),
        })
        .collect::<Vec<String>>()
        .join("")
}

fn join<'a>(items: impl Iterator<Item = &'a MalType>, print_readably: bool) -> String {
    items
        .map(|m| pr_str(m, print_readably))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print out the AST expression
///
/// With `print_readably` set, strings are quoted and escaped so the output reads back to the same value.
pub fn pr_str(ast: &MalType, print_readably: bool) -> String {
    match ast {
        MalType::String(s) => {
            if print_readably {
                format!("\"{}\"", escape(s))
            } else {
                s.clone()
            }
        }
        MalType::Nil => String::from("nil"),
        MalType::Bool(b) => b.to_string(),
        MalType::Number(n) => n.to_string(),
        MalType::Keyword(k) => k.clone(),
        MalType::Symbol(s) => s.clone(),
        MalType::List(l) => format!("({})", join(l.iter(), print_readably)),
        MalType::Vector(v) => format!("[{}]", join(v.iter(), print_readably)),
        MalType::Map(m) => format!(
            "{{{}}}",
            m.iter()
                .map(|(k, v)| format!(
                    "{} {}",
                    pr_str(k, print_readably),
                    pr_str(v, print_readably)
                ))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        MalType::LiftedFunc(f) => format!("#<builtin {}>", f.name),
        MalType::MalFunc(f) if f.is_macro => String::from("#<macro>"),
        MalType::MalFunc(_) => String::from("#<function>"),
        MalType::Atom(a) => format!("(atom {})", pr_str(&a.borrow(), print_readably)),
        MalType::Error(payload) => pr_str(payload, print_readably),
    }
}

/// Apply pr_str to each argument and join them together
pub fn stringify_args(args: &[MalType], print_readably: bool, join_str: &str) -> String {
    args.iter()
        .map(|a| pr_str(a, print_readably))
        .collect::<Vec<_>>()
        .join(join_str)
}
