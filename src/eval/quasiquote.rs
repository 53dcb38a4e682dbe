use crate::types::MalType;

fn quote(form: MalType) -> MalType {
    MalType::list(vec![MalType::symbol("quote"), form])
}

/// Rewrite a quasiquoted template into code that rebuilds it
///
/// Lists and vectors are rebuilt cell by cell with `cons`, spliced parts are joined with `concat`.
pub fn quasiquote(ast: &MalType) -> MalType {
    if !ast.is_pair() {
        return quote(ast.clone());
    }
    match ast.as_seq().unwrap_or_default() {
        [head, unquoted, ..] if head.is_symbol_named("unquote") => unquoted.clone(),
        [head, rest @ ..] => {
            let expanded_rest = quasiquote(&MalType::list(rest.to_vec()));
            match head.as_seq() {
                Some([splice, spliced, ..]) if splice.is_symbol_named("splice-unquote") => {
                    MalType::list(vec![MalType::symbol("concat"), spliced.clone(), expanded_rest])
                }
                _ => MalType::list(vec![MalType::symbol("cons"), quasiquote(head), expanded_rest]),
            }
        }
        [] => quote(ast.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{printer::pr_str, reader::read_str};
    use test_case::test_case;

    #[test_case("a", "(quote a)" ; "symbol is quoted")]
    #[test_case("()", "(quote ())" ; "empty list is quoted")]
    #[test_case("7", "(quote 7)" ; "number is quoted")]
    #[test_case("{\"a\" b}", "(quote {\"a\" b})" ; "map is quoted")]
    #[test_case("(unquote x)", "x" ; "unquote unwraps")]
    #[test_case("(1 (unquote x))", "(cons (quote 1) (cons x (quote ())))" ; "unquote inside list")]
    #[test_case("((splice-unquote xs) 2)", "(concat xs (cons (quote 2) (quote ())))" ; "splice at head")]
    #[test_case("[a]", "(cons (quote a) (quote ()))" ; "vector is rebuilt as a list")]
    #[test_case("((a))", "(cons (cons (quote a) (quote ())) (quote ()))" ; "nested list")]
    fn expansion(input: &str, expected: &str) {
        let form = read_str(input).expect("valid input");
        assert_eq!(pr_str(&quasiquote(&form), true), expected)
    }
}
