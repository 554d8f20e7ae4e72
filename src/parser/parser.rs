use log::trace;

use crate::lexer::{Lexer, Token, TokenKind, TokenValue};
use crate::source::{SourcePosition, SourceReader};

use super::ast::*;
use super::error::ParserError;

/// Recursive-descent parser with one token of lookahead.
///
/// `spec.md` §4.3's EBNF is implemented one production per method, in the
/// precedence order or / and / relational / additive / multiplicative /
/// cast / negation / primary.
pub struct Parser<R: SourceReader> {
    lexer: Lexer<R>,
    current: Token,
}

impl<R: SourceReader> Parser<R> {
    pub fn new(mut lexer: Lexer<R>) -> Result<Self, ParserError> {
        let current = lexer.next_token().map_err(lexer_error_to_parser_error)?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token, ParserError> {
        let previous = self.current.clone();
        self.current = self
            .lexer
            .next_token()
            .map_err(lexer_error_to_parser_error)?;
        Ok(previous)
    }

    /// Error if the current token isn't one of `kinds`.
    fn expect(&self, kinds: &[TokenKind]) -> Result<(), ParserError> {
        if kinds.contains(&self.current.kind) {
            Ok(())
        } else {
            Err(ParserError::new(
                self.current.position,
                self.current.kind,
                kinds.to_vec(),
            ))
        }
    }

    /// Expect, then advance, returning the matched token.
    fn consume(&mut self, kinds: &[TokenKind]) -> Result<Token, ParserError> {
        self.expect(kinds)?;
        self.advance()
    }

    pub fn parse_program(&mut self) -> Result<ParseTree, ParserError> {
        let mut declarations = Vec::new();
        declarations.push(self.parse_declaration()?);
        while self.current.kind != TokenKind::Eof {
            declarations.push(self.parse_declaration()?);
        }
        Ok(ParseTree { declarations })
    }

    fn parse_declaration(&mut self) -> Result<Declaration, ParserError> {
        trace!("parse_declaration at {:?}", self.current.kind);
        if self.current.kind == TokenKind::CurrencyType {
            let decl = self.parse_currency_declaration()?;
            self.consume(&[TokenKind::Semicolon])?;
            return Ok(Declaration::Currency(decl));
        }

        let type_tag = self.parse_type()?;
        let id_token = self.consume(&[TokenKind::Identifier])?;
        let id = id_token.lexeme;

        if self.current.kind == TokenKind::LeftParen {
            Ok(Declaration::Function(
                self.parse_function_rest(type_tag, id, id_token.position)?,
            ))
        } else {
            let decl = self.parse_variable_rest(type_tag, id, id_token.position)?;
            self.consume(&[TokenKind::Semicolon])?;
            Ok(Declaration::Variable(decl))
        }
    }

    fn parse_currency_declaration(&mut self) -> Result<CurrencyDeclaration, ParserError> {
        let name_token = self.consume(&[TokenKind::CurrencyType])?;
        self.consume(&[TokenKind::ColonEqual])?;
        let value_token = self.consume(&[TokenKind::FloatLiteral, TokenKind::IntLiteral])?;
        let rate = match value_token.value {
            TokenValue::Float(f) => f,
            TokenValue::Int(i) => i as f64,
            _ => unreachable!("rate token must be numeric"),
        };
        Ok(CurrencyDeclaration {
            name: name_token.lexeme,
            rate,
            position: value_token.position,
        })
    }

    fn parse_type(&mut self) -> Result<TypeTag, ParserError> {
        let tag = match self.current.kind {
            TokenKind::Int => TypeTag::Int,
            TokenKind::Float => TypeTag::Float,
            TokenKind::String => TypeTag::String,
            TokenKind::Bool => TypeTag::Bool,
            TokenKind::Void => TypeTag::Void,
            TokenKind::CurrencyType => TypeTag::Currency(self.current.lexeme.clone()),
            _ => {
                return Err(ParserError::new(
                    self.current.position,
                    self.current.kind,
                    vec![
                        TokenKind::Int,
                        TokenKind::Float,
                        TokenKind::String,
                        TokenKind::Bool,
                        TokenKind::Void,
                        TokenKind::CurrencyType,
                    ],
                ))
            }
        };
        self.advance()?;
        Ok(tag)
    }

    fn parse_function_rest(
        &mut self,
        return_type: TypeTag,
        id: String,
        position: SourcePosition,
    ) -> Result<FunctionDeclaration, ParserError> {
        self.consume(&[TokenKind::LeftParen])?;
        let params = self.parse_params()?;
        self.consume(&[TokenKind::RightParen])?;
        self.consume(&[TokenKind::LeftBrace])?;
        let body = self.parse_statements()?;
        self.consume(&[TokenKind::RightBrace])?;
        Ok(FunctionDeclaration {
            return_type,
            id,
            params,
            body,
            position,
        })
    }

    fn parse_variable_rest(
        &mut self,
        type_tag: TypeTag,
        id: String,
        position: SourcePosition,
    ) -> Result<VariableDeclaration, ParserError> {
        let initializer = if self.current.kind == TokenKind::Equal {
            self.advance()?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(VariableDeclaration {
            type_tag,
            id,
            initializer,
            position,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParserError> {
        let mut params = Vec::new();
        if !is_type_start(self.current.kind) {
            return Ok(params);
        }
        loop {
            let type_tag = self.parse_type()?;
            let id_token = self.consume(&[TokenKind::Identifier])?;
            params.push(Param {
                id: id_token.lexeme,
                type_tag,
            });
            if self.current.kind == TokenKind::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_statements(&mut self) -> Result<Statements, ParserError> {
        let mut statements = Vec::new();
        loop {
            let (stmt, needs_semicolon) = match self.current.kind {
                k if is_type_start(k) => {
                    let type_tag = self.parse_type()?;
                    let id_token = self.consume(&[TokenKind::Identifier])?;
                    let decl =
                        self.parse_variable_rest(type_tag, id_token.lexeme, id_token.position)?;
                    (Statement::VariableDeclaration(decl), true)
                }
                TokenKind::Identifier => {
                    let id_token = self.advance()?;
                    if self.current.kind == TokenKind::Equal {
                        self.advance()?;
                        let expression = self.parse_expression()?;
                        (
                            Statement::Assignment(Assignment {
                                id: id_token.lexeme,
                                expression,
                                position: id_token.position,
                            }),
                            true,
                        )
                    } else {
                        (
                            Statement::Call(
                                self.parse_function_call_rest(id_token.lexeme, id_token.position)?,
                            ),
                            true,
                        )
                    }
                }
                TokenKind::Return => (Statement::Return(self.parse_return_statement()?), true),
                TokenKind::If => (Statement::If(self.parse_if_statement()?), false),
                TokenKind::While => (Statement::While(self.parse_while_statement()?), false),
                _ => break,
            };
            if needs_semicolon {
                self.consume(&[TokenKind::Semicolon])?;
            }
            statements.push(stmt);
        }
        Ok(Statements { statements })
    }

    fn parse_return_statement(&mut self) -> Result<ReturnStatement, ParserError> {
        let return_token = self.advance()?; // "return"
        if self.current.kind == TokenKind::Semicolon {
            return Ok(ReturnStatement {
                expression: None,
                position: return_token.position,
            });
        }
        let expression = self.parse_expression()?;
        Ok(ReturnStatement {
            expression: Some(expression),
            position: return_token.position,
        })
    }

    fn parse_if_statement(&mut self) -> Result<IfStatement, ParserError> {
        let if_token = self.advance()?; // "if"
        self.consume(&[TokenKind::LeftParen])?;
        let condition = self.parse_expression()?;
        self.consume(&[TokenKind::RightParen])?;
        self.consume(&[TokenKind::LeftBrace])?;
        let body = self.parse_statements()?;
        self.consume(&[TokenKind::RightBrace])?;
        Ok(IfStatement {
            condition,
            body,
            position: if_token.position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<WhileStatement, ParserError> {
        let while_token = self.advance()?; // "while"
        self.consume(&[TokenKind::LeftParen])?;
        let condition = self.parse_expression()?;
        self.consume(&[TokenKind::RightParen])?;
        self.consume(&[TokenKind::LeftBrace])?;
        let body = self.parse_statements()?;
        self.consume(&[TokenKind::RightBrace])?;
        Ok(WhileStatement {
            condition,
            body,
            position: while_token.position,
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        let position = self.current.position;
        let mut and_expressions = vec![self.parse_and_expression()?];
        while self.current.kind == TokenKind::Or {
            self.advance()?;
            and_expressions.push(self.parse_and_expression()?);
        }
        Ok(Expression {
            and_expressions,
            position,
        })
    }

    fn parse_and_expression(&mut self) -> Result<AndExpression, ParserError> {
        let position = self.current.position;
        let mut relationships = vec![self.parse_relationship_expression()?];
        while self.current.kind == TokenKind::And {
            self.advance()?;
            relationships.push(self.parse_relationship_expression()?);
        }
        Ok(AndExpression {
            relationships,
            position,
        })
    }

    fn parse_relationship_expression(&mut self) -> Result<RelationshipExpression, ParserError> {
        let position = self.current.position;
        let left = self.parse_sum_expression()?;
        let op = match self.current.kind {
            TokenKind::EqualEqual => Some(RelOp::Eq),
            TokenKind::BangEqual => Some(RelOp::Ne),
            TokenKind::Less => Some(RelOp::Lt),
            TokenKind::Greater => Some(RelOp::Gt),
            TokenKind::LessEqual => Some(RelOp::Le),
            TokenKind::GreaterEqual => Some(RelOp::Ge),
            _ => None,
        };
        let right = match op {
            Some(op) => {
                self.advance()?;
                Some((op, self.parse_sum_expression()?))
            }
            None => None,
        };
        Ok(RelationshipExpression {
            left,
            right,
            position,
        })
    }

    fn parse_sum_expression(&mut self) -> Result<SumExpression, ParserError> {
        let position = self.current.position;
        let left = self.parse_multiply_expression()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => SumOp::Add,
                TokenKind::Minus => SumOp::Sub,
                _ => break,
            };
            self.advance()?;
            rest.push((op, self.parse_multiply_expression()?));
        }
        Ok(SumExpression {
            left,
            rest,
            position,
        })
    }

    fn parse_multiply_expression(&mut self) -> Result<MultiplyExpression, ParserError> {
        let position = self.current.position;
        let left = self.parse_type_casting_factor()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.current.kind {
                TokenKind::Star => MulOp::Mul,
                TokenKind::Slash => MulOp::Div,
                TokenKind::Percent => MulOp::Mod,
                _ => break,
            };
            self.advance()?;
            rest.push((op, self.parse_type_casting_factor()?));
        }
        Ok(MultiplyExpression {
            left,
            rest,
            position,
        })
    }

    /// `spec.md`'s cast grammar is `[type] negationFactor` — the cast
    /// type, if present, prefixes the factor directly with no
    /// parentheses.
    fn parse_type_casting_factor(&mut self) -> Result<TypeCastingFactor, ParserError> {
        let position = self.current.position;
        let cast_type = if is_type_start(self.current.kind) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let negation_factor = self.parse_negation_factor()?;
        Ok(TypeCastingFactor {
            negation_factor,
            cast_type,
            position,
        })
    }

    fn parse_negation_factor(&mut self) -> Result<NegationFactor, ParserError> {
        let position = self.current.position;
        let negated = if self.current.kind == TokenKind::Bang {
            self.advance()?;
            true
        } else {
            false
        };
        let factor = self.parse_factor()?;
        Ok(NegationFactor {
            factor,
            negated,
            position,
        })
    }

    fn parse_factor(&mut self) -> Result<Factor, ParserError> {
        match self.current.kind {
            TokenKind::LeftParen => {
                self.advance()?;
                let expression = self.parse_expression()?;
                self.consume(&[TokenKind::RightParen])?;
                Ok(Factor::Grouped(Box::new(expression)))
            }
            TokenKind::Identifier => {
                let id_token = self.advance()?;
                if self.current.kind == TokenKind::LeftParen {
                    Ok(Factor::FunctionCall(
                        self.parse_function_call_rest(id_token.lexeme, id_token.position)?,
                    ))
                } else {
                    Ok(Factor::Variable(id_token.lexeme, id_token.position))
                }
            }
            TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::BoolLiteral
            | TokenKind::CurrencyLiteral => {
                let token = self.advance()?;
                let value = match token.value {
                    TokenValue::Int(i) => ConstantValue::Int(i),
                    TokenValue::Float(f) => ConstantValue::Float(f),
                    TokenValue::String(s) => ConstantValue::String(s),
                    TokenValue::Bool(b) => ConstantValue::Bool(b),
                    TokenValue::Currency(amount, name) => ConstantValue::Currency(amount, name),
                    TokenValue::Unit => unreachable!("literal token without a payload"),
                };
                Ok(Factor::Constant(value, token.position))
            }
            _ => Err(ParserError::with_message(
                self.current.position,
                self.current.kind,
                vec![],
                "expected a nested expression, constant, variable, or function call",
            )),
        }
    }

    fn parse_function_call_rest(
        &mut self,
        id: String,
        position: SourcePosition,
    ) -> Result<FunctionCall, ParserError> {
        self.consume(&[TokenKind::LeftParen])?;
        let mut args = Vec::new();
        if self.current.kind != TokenKind::RightParen {
            args.push(self.parse_expression()?);
            while self.current.kind == TokenKind::Comma {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
        }
        self.consume(&[TokenKind::RightParen])?;
        Ok(FunctionCall { id, args, position })
    }
}

fn is_type_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::Bool
            | TokenKind::Void
            | TokenKind::CurrencyType
    )
}

fn lexer_error_to_parser_error(err: crate::lexer::LexerError) -> ParserError {
    ParserError::with_message(err.position, TokenKind::Eof, vec![], err.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::source::StrSource;

    fn parse(src: &str) -> ParseTree {
        let lexer = Lexer::new(StrSource::new(src), Limits::default());
        let mut parser = Parser::new(lexer).expect("lexing the first token should not fail");
        parser.parse_program().expect("program should parse")
    }

    #[test]
    fn parses_main_returning_constant() {
        let tree = parse("int main(){return 3;}");
        assert_eq!(tree.declarations.len(), 1);
        match &tree.declarations[0] {
            Declaration::Function(f) => {
                assert_eq!(f.id, "main");
                assert_eq!(f.return_type, TypeTag::Int);
                assert_eq!(f.body.statements.len(), 1);
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn additive_binds_looser_than_multiplicative() {
        let tree = parse("int main(){ return 2 + 2 * 2; }");
        let Declaration::Function(f) = &tree.declarations[0] else {
            panic!("expected function")
        };
        let Statement::Return(ret) = &f.body.statements[0] else {
            panic!("expected return")
        };
        let expr = ret.expression.as_ref().unwrap();
        let sum = &expr.and_expressions[0].relationships[0].left;
        // "2 + 2 * 2" => left = 2, rest = [(Add, 2*2)]
        assert_eq!(sum.rest.len(), 1);
        assert_eq!(sum.rest[0].0, SumOp::Add);
        assert_eq!(sum.rest[0].1.rest.len(), 1);
    }

    #[test]
    fn sum_is_left_associative() {
        let tree = parse("int main(){ return a - b - c; }");
        let Declaration::Function(f) = &tree.declarations[0] else {
            panic!("expected function")
        };
        let Statement::Return(ret) = &f.body.statements[0] else {
            panic!("expected return")
        };
        let sum = &ret.expression.as_ref().unwrap().and_expressions[0].relationships[0].left;
        assert_eq!(sum.rest.len(), 2);
        assert_eq!(sum.rest[0].0, SumOp::Sub);
        assert_eq!(sum.rest[1].0, SumOp::Sub);
    }

    #[test]
    fn parses_currency_declaration() {
        let tree = parse("EUR := 2.0; int main(){return 1;}");
        match &tree.declarations[0] {
            Declaration::Currency(c) => {
                assert_eq!(c.name, "EUR");
                assert_eq!(c.rate, 2.0);
            }
            other => panic!("expected currency declaration, got {other:?}"),
        }
    }

    #[test]
    fn parses_cast_factor_prefix() {
        let tree = parse("EUR := 2.0; USD := 1.0; EUR main(){ return EUR 1.0USD; }");
        let Declaration::Function(f) = &tree.declarations[2] else {
            panic!("expected function")
        };
        let Statement::Return(ret) = &f.body.statements[0] else {
            panic!("expected return")
        };
        let factor = &ret.expression.as_ref().unwrap().and_expressions[0].relationships[0].left.left;
        assert_eq!(factor.cast_type, Some(TypeTag::Currency("EUR".to_string())));
    }

    #[test]
    fn rejects_else_branch() {
        let lexer = Lexer::new(
            StrSource::new("int main(){ if (true) {} else {} return 0; }"),
            Limits::default(),
        );
        let mut parser = Parser::new(lexer).unwrap();
        assert!(parser.parse_program().is_err());
    }

    #[test]
    fn function_call_with_args() {
        let tree = parse("int main(){ return f(1, 2, a); }");
        let Declaration::Function(f) = &tree.declarations[0] else {
            panic!("expected function")
        };
        let Statement::Return(ret) = &f.body.statements[0] else {
            panic!("expected return")
        };
        let factor = &ret.expression.as_ref().unwrap().and_expressions[0].relationships[0]
            .left
            .left
            .left
            .negation_factor
            .factor;
        match factor {
            Factor::FunctionCall(call) => {
                assert_eq!(call.id, "f");
                assert_eq!(call.args.len(), 3);
            }
            other => panic!("expected function call factor, got {other:?}"),
        }
    }
}
