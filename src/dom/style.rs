//! Inline style declaration parsing using cssparser
//!
//! Parses `cssText`-style declaration blocks ("position: absolute; top:
//! 10px") into property/value pairs. Values are kept as raw source slices;
//! the host page model only needs get/set/remove semantics, never computed
//! values.

use cssparser::{Delimiter, ParseError, Parser, ParserInput};

/// Parse an inline declaration block into (property, value) pairs
///
/// Malformed declarations are skipped, matching how browsers recover inside
/// a style attribute.
pub fn parse_inline_style(input: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut parser_input = ParserInput::new(input);
    let mut parser = Parser::new(&mut parser_input);

    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }

        let result: Result<(String, String), ParseError<'_, ()>> = parser
            .parse_until_after(Delimiter::Semicolon, |p| {
                let property = p.expect_ident()?.to_string();
                p.expect_colon()?;
                p.skip_whitespace();
                let start = p.position();
                while p.next().is_ok() {}
                let value = p.slice_from(start).trim().to_string();
                Ok((property, value))
            });

        match result {
            Ok((property, value)) if !value.is_empty() => {
                declarations.push((property.to_ascii_lowercase(), value));
            }
            _ => {} // parse_until_after already consumed past the semicolon
        }
    }

    declarations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_block() {
        let decls = parse_inline_style("position: absolute; top: 10px; left: 10px");
        assert_eq!(
            decls,
            vec![
                ("position".to_string(), "absolute".to_string()),
                ("top".to_string(), "10px".to_string()),
                ("left".to_string(), "10px".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_preserves_function_values() {
        let decls = parse_inline_style("background: rgba(0, 0, 0, 0.8); transition: opacity 0.3s ease");
        assert_eq!(decls[0].0, "background");
        assert_eq!(decls[0].1, "rgba(0, 0, 0, 0.8)");
        assert_eq!(decls[1].1, "opacity 0.3s ease");
    }

    #[test]
    fn test_parse_skips_malformed_declarations() {
        let decls = parse_inline_style("color red; display: none; : nope; opacity");
        assert_eq!(decls, vec![("display".to_string(), "none".to_string())]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_inline_style("").is_empty());
        assert!(parse_inline_style("   ;  ; ").is_empty());
    }

    #[test]
    fn test_property_names_lowercased() {
        let decls = parse_inline_style("Z-Index: 99999");
        assert_eq!(decls, vec![("z-index".to_string(), "99999".to_string())]);
    }
}
