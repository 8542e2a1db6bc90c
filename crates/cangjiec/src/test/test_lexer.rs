use crate::interner::Interner;
use crate::lexer::Lexer;
use crate::token::TokenKind;

fn tokens(src: &str) -> Vec<TokenKind> {
    let mut interner = Interner::new();
    let mut lexer = Lexer::new(src, "test");
    let mut out = Vec::new();
    loop {
        let tok = lexer.next_token(&mut interner).unwrap();
        let done = tok.kind == TokenKind::Eof;
        out.push(tok.kind);
        if done {
            break;
        }
    }
    out
}

#[test]
fn keywords_and_identifiers_are_distinguished() {
    let kinds = tokens("let match");
    assert_eq!(kinds[0], TokenKind::KwLet);
    assert_eq!(kinds[1], TokenKind::KwMatch);
}

#[test]
fn range_operators_are_not_confused_with_single_dot() {
    let kinds = tokens("1..5 1..=5");
    assert!(kinds.contains(&TokenKind::Concat));
    assert!(kinds.contains(&TokenKind::ConcatEq));
}

#[test]
fn numeral_literals_cover_int_and_float() {
    let kinds = tokens("42 3.5");
    assert!(matches!(kinds[0], TokenKind::Int(42)));
    assert!(matches!(kinds[1], TokenKind::Float(f) if (f - 3.5).abs() < f64::EPSILON));
}

#[test]
fn coalesce_and_fat_arrow_lex_as_single_tokens() {
    let kinds = tokens("a ?? b => c");
    assert!(kinds.contains(&TokenKind::Coalesce));
    assert!(kinds.contains(&TokenKind::FatArrow));
}

#[test]
fn left_arrow_and_label_colons_lex_as_single_tokens() {
    let kinds = tokens("let Some(c) <- x ::top::");
    assert!(kinds.contains(&TokenKind::LArrow));
    assert!(kinds.contains(&TokenKind::ColonColon));
    assert!(!kinds.contains(&TokenKind::Lt));
}

#[test]
fn string_literal_with_interpolation_splits_into_head_mid_tail() {
    let mut interner = Interner::new();
    let mut lexer = Lexer::new(r#""a${x}b""#, "test");
    let head = lexer.next_token(&mut interner).unwrap();
    assert!(matches!(head.kind, TokenKind::InterpHead(_)));
}

#[test]
fn unterminated_string_is_a_lexical_error() {
    let mut interner = Interner::new();
    let mut lexer = Lexer::new("\"abc", "test");
    assert!(lexer.next_token(&mut interner).is_err());
}
