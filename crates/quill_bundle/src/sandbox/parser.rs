//! Recursive-descent parser for the module language.

use super::lexer::{Token, TokenKind};
use super::EvalError;

const MAX_DEPTH: usize = 64;

static EOF: TokenKind = TokenKind::Eof;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Expr {
    Str(String),
    Ident(String),
    /// `a + b + ...`, flattened so long chains stay shallow.
    Concat(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Target {
    /// `module.exports`
    ModuleExports,
    /// `module.exports.NAME`
    ModuleExportsMember(String),
    /// `exports.NAME`
    ExportsMember(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Stmt {
    Bind(String, Expr),
    Assign(Target, Expr),
    Throw(Expr),
}

pub(super) fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, EvalError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&EOF, |t| &t.kind)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EvalError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}, found {}", describe(self.peek()))))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, EvalError> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            other => Err(self.error(format!("expected {what}, found {}", describe(other)))),
        }
    }

    fn keyword(&mut self, word: &str) -> Result<(), EvalError> {
        match self.peek() {
            TokenKind::Ident(name) if name == word => {
                self.bump();
                Ok(())
            }
            other => Err(self.error(format!("expected '{word}', found {}", describe(other)))),
        }
    }

    fn error(&self, message: String) -> EvalError {
        EvalError::Syntax {
            line: self.line(),
            message,
        }
    }

    fn program(&mut self) -> Result<Vec<Stmt>, EvalError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => return Ok(stmts),
                TokenKind::Semi => {
                    self.bump();
                }
                _ => {
                    stmts.push(self.statement()?);
                    self.eat(&TokenKind::Semi);
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, EvalError> {
        let head = match self.peek() {
            TokenKind::Ident(name) => name.clone(),
            other => return Err(self.error(format!("expected a statement, found {}", describe(other)))),
        };
        match head.as_str() {
            "var" | "let" | "const" => {
                self.bump();
                let name = self.ident("a binding name")?;
                self.expect(&TokenKind::Eq, "'='")?;
                Ok(Stmt::Bind(name, self.expr()?))
            }
            "throw" => {
                self.bump();
                Ok(Stmt::Throw(self.expr()?))
            }
            "module" => {
                self.bump();
                self.expect(&TokenKind::Dot, "'.'")?;
                self.keyword("exports")?;
                let target = if self.eat(&TokenKind::Dot) {
                    Target::ModuleExportsMember(self.ident("a property name")?)
                } else {
                    Target::ModuleExports
                };
                self.expect(&TokenKind::Eq, "'='")?;
                Ok(Stmt::Assign(target, self.expr()?))
            }
            "exports" => {
                self.bump();
                self.expect(&TokenKind::Dot, "'.'")?;
                let name = self.ident("a property name")?;
                self.expect(&TokenKind::Eq, "'='")?;
                Ok(Stmt::Assign(Target::ExportsMember(name), self.expr()?))
            }
            _ => Err(self.error(format!("unsupported statement starting with '{head}'"))),
        }
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply".to_string()));
        }
        let first = self.primary()?;
        let expr = if self.peek() == &TokenKind::Plus {
            let mut terms = vec![first];
            while self.eat(&TokenKind::Plus) {
                terms.push(self.primary()?);
            }
            Expr::Concat(terms)
        } else {
            first
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.bump() {
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBrace => self.object(),
            other => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(format!("expected an expression, found {}", describe(&other))))
            }
        }
    }

    fn object(&mut self) -> Result<Expr, EvalError> {
        let mut fields = Vec::new();
        loop {
            let key = match self.bump() {
                TokenKind::RBrace => return Ok(Expr::Object(fields)),
                TokenKind::Ident(name) => name,
                TokenKind::Str(s) => s,
                other => {
                    return Err(self.error(format!("expected a property key, found {}", describe(&other))))
                }
            };
            self.expect(&TokenKind::Colon, "':'")?;
            fields.push((key, self.expr()?));
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace, "'}'")?;
                return Ok(Expr::Object(fields));
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Str(_) => "a string".to_string(),
        TokenKind::Eq => "'='".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Semi => "';'".to_string(),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::*;

    fn parse_str(source: &str) -> Result<Vec<Stmt>, EvalError> {
        parse(&lex(source)?)
    }

    #[test]
    fn concat_chain_is_flat() {
        let stmts = parse_str("var x = a + 'b' + (c + d)").unwrap();
        assert_eq!(
            stmts,
            vec![Stmt::Bind(
                "x".into(),
                Expr::Concat(vec![
                    Expr::Ident("a".into()),
                    Expr::Str("b".into()),
                    Expr::Concat(vec![Expr::Ident("c".into()), Expr::Ident("d".into())]),
                ])
            )]
        );
    }

    #[test]
    fn long_concat_chain_parses() {
        let source = format!("var x = {};", vec!["'c'"; 20_000].join(" + "));
        match parse_str(&source).unwrap().as_slice() {
            [Stmt::Bind(_, Expr::Concat(terms))] => assert_eq!(terms.len(), 20_000),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_targets() {
        let stmts = parse_str("module.exports = a; module.exports.x = a; exports.y = a;").unwrap();
        let targets: Vec<Target> = stmts
            .into_iter()
            .map(|s| match s {
                Stmt::Assign(t, _) => t,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                Target::ModuleExports,
                Target::ModuleExportsMember("x".into()),
                Target::ExportsMember("y".into()),
            ]
        );
    }

    #[test]
    fn rejects_other_statements() {
        assert!(parse_str("window.x = 'a';").is_err());
        assert!(parse_str("exports = 'a';").is_err());
        assert!(parse_str("var x 'a';").is_err());
        assert!(parse_str("var x = ;").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("var x = {}'a'{};", "(".repeat(100), ")".repeat(100));
        assert!(matches!(parse_str(&source), Err(EvalError::Syntax { .. })));
    }
}
