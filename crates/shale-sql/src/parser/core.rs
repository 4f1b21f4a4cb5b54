//! SQL Parser implementation.

use crate::ast::{
    AggregateFunc, Assignment, BinaryOp, ColumnDef, ColumnRef, CreateTableStatement,
    DeleteStatement, DropTableStatement, Expr, ForeignKeyRef, InsertStatement, Join, JoinKind,
    Literal, OrderBy, OrderDirection, SelectItem, SelectStatement, Statement, TableRef, TypeName,
    UnaryOp, UpdateStatement,
};
use crate::lexer::{Keyword, Token, TokenKind};

use super::error::ParseError;

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)` where higher binds tighter and
/// `left_bp < right_bp` gives left associativity. Returns `None` if the
/// token is not an infix operator.
const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        // Logical OR (lowest precedence)
        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),

        // Logical AND
        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        // Comparison operators, IS, BETWEEN
        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Keyword(Keyword::Is | Keyword::Between) => Some((5, 6)),

        // Additive
        TokenKind::Plus | TokenKind::Minus => Some((7, 8)),

        // Multiplicative
        TokenKind::Star | TokenKind::Slash => Some((9, 10)),

        _ => None,
    }
}

/// Binding power of prefix minus; tighter than any infix operator.
const PREFIX_MINUS_BP: u8 = 11;

/// Converts a token to a binary operator.
const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        _ => None,
    }
}

/// Maps an aggregate keyword to its function.
const fn keyword_to_aggregate(kw: Keyword) -> Option<AggregateFunc> {
    match kw {
        Keyword::Count => Some(AggregateFunc::Count),
        Keyword::Sum => Some(AggregateFunc::Sum),
        Keyword::Avg => Some(AggregateFunc::Avg),
        Keyword::Min => Some(AggregateFunc::Min),
        Keyword::Max => Some(AggregateFunc::Max),
        _ => None,
    }
}

/// SQL Parser over a lexed token stream.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    /// Creates a new parser for the given token stream.
    ///
    /// The stream must end with an [`TokenKind::Eof`] token, as produced
    /// by [`crate::Lexer::tokenize`].
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Self { tokens, index: 0 }
    }

    /// Parses the entire stream as a list of `;`-separated statements.
    ///
    /// A trailing `;` is optional; an empty input yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] at the first deviation from the grammar.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();

        loop {
            while self.check(&TokenKind::Semicolon) {
                self.advance();
            }
            if self.current().is_eof() {
                break;
            }

            statements.push(self.parse_statement()?);

            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.current().is_eof() {
                return Err(self.unexpected(";"));
            }
        }

        Ok(statements)
    }

    /// Parses a single SQL statement.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the input is not a valid statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current().as_keyword() {
            Some(Keyword::Select) => Ok(Statement::Select(self.parse_select_statement()?)),
            Some(Keyword::Insert) => Ok(Statement::Insert(self.parse_insert_statement()?)),
            Some(Keyword::Update) => Ok(Statement::Update(self.parse_update_statement()?)),
            Some(Keyword::Delete) => Ok(Statement::Delete(self.parse_delete_statement()?)),
            Some(Keyword::Create) => Ok(Statement::CreateTable(self.parse_create_table()?)),
            Some(Keyword::Drop) => Ok(Statement::DropTable(self.parse_drop_table()?)),
            _ => Err(self.unexpected("SELECT, INSERT, UPDATE, DELETE, CREATE, or DROP")),
        }
    }

    /// Parses a CREATE TABLE statement.
    fn parse_create_table(&mut self) -> Result<CreateTableStatement, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut columns = vec![self.parse_column_def()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            columns.push(self.parse_column_def()?);
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(CreateTableStatement { name, columns })
    }

    /// Parses a single column definition: `name type constraint*`.
    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_type_name()?;

        let mut def = ColumnDef {
            name,
            data_type,
            primary_key: false,
            not_null: false,
            unique: false,
            references: None,
        };

        loop {
            match self.current().as_keyword() {
                Some(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    def.primary_key = true;
                }
                Some(Keyword::Not) => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    def.not_null = true;
                }
                Some(Keyword::Unique) => {
                    self.advance();
                    def.unique = true;
                }
                Some(Keyword::References) => {
                    self.advance();
                    let table = self.expect_identifier()?;
                    self.expect(&TokenKind::LeftParen)?;
                    let column = self.expect_identifier()?;
                    self.expect(&TokenKind::RightParen)?;
                    def.references = Some(ForeignKeyRef { table, column });
                }
                _ => break,
            }
        }

        Ok(def)
    }

    /// Parses a column type name.
    fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let type_name = match self.current().as_keyword() {
            Some(Keyword::Int) => TypeName::Int,
            Some(Keyword::Text) => TypeName::Text,
            Some(Keyword::Float) => TypeName::Float,
            Some(Keyword::Boolean) => TypeName::Boolean,
            _ => return Err(self.unexpected("column type (INT, TEXT, FLOAT, or BOOLEAN)")),
        };
        self.advance();
        Ok(type_name)
    }

    /// Parses a DROP TABLE statement.
    fn parse_drop_table(&mut self) -> Result<DropTableStatement, ParseError> {
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Table)?;
        let name = self.expect_identifier()?;
        Ok(DropTableStatement { name })
    }

    /// Parses an INSERT statement.
    fn parse_insert_statement(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;

        // Column list (optional)
        let columns = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&TokenKind::RightParen)?;
            cols
        } else {
            vec![]
        };

        self.expect_keyword(Keyword::Values)?;

        let mut rows = vec![];
        loop {
            self.expect(&TokenKind::LeftParen)?;
            let mut row = vec![self.parse_literal()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                row.push(self.parse_literal()?);
            }
            self.expect(&TokenKind::RightParen)?;
            rows.push(row);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table,
            columns,
            rows,
        })
    }

    /// Parses a literal value inside VALUES.
    ///
    /// Identifiers are not permitted here; a leading minus folds into
    /// the numeric literal.
    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let literal = match &self.current().kind {
            TokenKind::Integer(n) => Literal::Integer(*n),
            TokenKind::Float(x) => Literal::Float(*x),
            TokenKind::Str(s) => Literal::Str(s.clone()),
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            TokenKind::Minus => {
                self.advance();
                let literal = match &self.current().kind {
                    TokenKind::Integer(n) => Literal::Integer(-n),
                    TokenKind::Float(x) => Literal::Float(-x),
                    _ => return Err(self.unexpected("numeric literal")),
                };
                self.advance();
                return Ok(literal);
            }
            _ => return Err(self.unexpected("literal value")),
        };
        self.advance();
        Ok(literal)
    }

    /// Parses an UPDATE statement.
    fn parse_update_statement(&mut self) -> Result<UpdateStatement, ParseError> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = vec![];
        loop {
            let column = self.expect_identifier()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression(0)?;
            assignments.push(Assignment { column, value });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
        })
    }

    /// Parses a DELETE statement.
    fn parse_delete_statement(&mut self) -> Result<DeleteStatement, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier()?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    /// Parses a SELECT statement.
    fn parse_select_statement(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let items = self.parse_select_items()?;

        self.expect_keyword(Keyword::From)?;
        let from = self.parse_table_ref()?;

        let mut joins = vec![];
        while self.is_join_keyword() {
            joins.push(self.parse_join()?);
        }

        let where_clause = self.parse_optional_where()?;

        let group_by = if self.check_keyword(Keyword::Group) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_column_ref_list()?
        } else {
            vec![]
        };

        let order_by = if self.check_keyword(Keyword::Order) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            vec![]
        };

        Ok(SelectStatement {
            distinct,
            items,
            from,
            joins,
            where_clause,
            group_by,
            order_by,
        })
    }

    /// Parses the SELECT list.
    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = vec![];

        loop {
            items.push(self.parse_select_item()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    /// Parses one SELECT list item: `*`, `t.*`, or `expr [AS] alias`.
    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(SelectItem::Wildcard { table: None });
        }

        // t.* needs two tokens of lookahead past the identifier
        if let TokenKind::Identifier(table) = &self.current().kind {
            if self.peek_kind(1) == Some(&TokenKind::Dot)
                && self.peek_kind(2) == Some(&TokenKind::Star)
            {
                let table = table.clone();
                self.advance(); // identifier
                self.advance(); // .
                self.advance(); // *
                return Ok(SelectItem::Wildcard { table: Some(table) });
            }
        }

        let expr = self.parse_expression(0)?;
        let alias = self.parse_optional_alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    /// Parses a table reference with an optional alias.
    fn parse_table_ref(&mut self) -> Result<TableRef, ParseError> {
        let name = self.expect_identifier()?;
        let alias = self.parse_optional_alias()?;
        Ok(TableRef { name, alias })
    }

    /// Parses an optional alias: `AS name` or a bare identifier.
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.check_keyword(Keyword::As) {
            self.advance();
            Ok(Some(self.expect_identifier()?))
        } else if matches!(&self.current().kind, TokenKind::Identifier(_)) {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    /// Checks if the current token starts a join clause.
    fn is_join_keyword(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(Keyword::Join | Keyword::Inner | Keyword::Left | Keyword::Right | Keyword::Full)
        )
    }

    /// Parses a join clause.
    fn parse_join(&mut self) -> Result<Join, ParseError> {
        let kind = self.parse_join_kind()?;
        let table = self.parse_table_ref()?;
        self.expect_keyword(Keyword::On)?;
        let on = self.parse_expression(0)?;

        Ok(Join { kind, table, on })
    }

    /// Parses the join kind; a bare `JOIN` is INNER.
    fn parse_join_kind(&mut self) -> Result<JoinKind, ParseError> {
        let kind = match self.current().as_keyword() {
            Some(Keyword::Join) => {
                self.advance();
                JoinKind::Inner
            }
            Some(Keyword::Inner) => {
                self.advance();
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Inner
            }
            Some(Keyword::Left) => {
                self.advance();
                if self.check_keyword(Keyword::Outer) {
                    self.advance();
                }
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Left
            }
            Some(Keyword::Right) => {
                self.advance();
                if self.check_keyword(Keyword::Outer) {
                    self.advance();
                }
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Right
            }
            Some(Keyword::Full) => {
                self.advance();
                if self.check_keyword(Keyword::Outer) {
                    self.advance();
                }
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Full
            }
            _ => return Err(self.unexpected("JOIN keyword")),
        };
        Ok(kind)
    }

    /// Parses an optional WHERE clause.
    fn parse_optional_where(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.check_keyword(Keyword::Where) {
            self.advance();
            Ok(Some(self.parse_expression(0)?))
        } else {
            Ok(None)
        }
    }

    /// Parses a comma-separated list of column references.
    fn parse_column_ref_list(&mut self) -> Result<Vec<ColumnRef>, ParseError> {
        let mut refs = vec![self.parse_column_ref()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            refs.push(self.parse_column_ref()?);
        }
        Ok(refs)
    }

    /// Parses a possibly-qualified column reference.
    fn parse_column_ref(&mut self) -> Result<ColumnRef, ParseError> {
        let pos = self.current().pos;
        let first = self.expect_identifier()?;

        if self.check(&TokenKind::Dot) {
            self.advance();
            let name = self.expect_identifier()?;
            Ok(ColumnRef {
                table: Some(first),
                name,
                pos,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                name: first,
                pos,
            })
        }
    }

    /// Parses an ORDER BY list.
    fn parse_order_by_list(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        let mut items = vec![];
        loop {
            let column = self.parse_column_ref()?;
            let direction = if self.check_keyword(Keyword::Desc) {
                self.advance();
                OrderDirection::Desc
            } else if self.check_keyword(Keyword::Asc) {
                self.advance();
                OrderDirection::Asc
            } else {
                OrderDirection::Asc
            };

            items.push(OrderBy { column, direction });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(items)
    }

    /// Parses an expression with binding-power precedence climbing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let (l_bp, r_bp) = match infix_binding_power(&self.current().kind) {
                Some(bp) => bp,
                None => break,
            };

            if l_bp < min_bp {
                break;
            }

            match self.current().as_keyword() {
                Some(Keyword::Is) => {
                    self.advance();
                    let negated = if self.check_keyword(Keyword::Not) {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    self.expect_keyword(Keyword::Null)?;
                    lhs = Expr::IsNull {
                        expr: Box::new(lhs),
                        negated,
                    };
                }
                Some(Keyword::Between) => {
                    // x BETWEEN a AND b desugars to x >= a AND x <= b
                    self.advance();
                    let low = self.parse_expression(r_bp)?;
                    self.expect_keyword(Keyword::And)?;
                    let high = self.parse_expression(r_bp)?;
                    lhs = Expr::Binary {
                        left: Box::new(Expr::Binary {
                            left: Box::new(lhs.clone()),
                            op: BinaryOp::GtEq,
                            right: Box::new(low),
                        }),
                        op: BinaryOp::And,
                        right: Box::new(Expr::Binary {
                            left: Box::new(lhs),
                            op: BinaryOp::LtEq,
                            right: Box::new(high),
                        }),
                    };
                }
                _ => {
                    // Standard binary operator
                    let Some(op) = token_to_binary_op(&self.current().kind) else {
                        break;
                    };
                    self.advance();
                    let rhs = self.parse_expression(r_bp)?;
                    lhs = Expr::Binary {
                        left: Box::new(lhs),
                        op,
                        right: Box::new(rhs),
                    };
                }
            }
        }

        Ok(lhs)
    }

    /// Parses a prefix expression.
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            let operand = self.parse_expression(PREFIX_MINUS_BP)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.current().pos;

        match &self.current().kind {
            // Literals
            TokenKind::Integer(n) => {
                let n = *n;
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(x) => {
                let x = *x;
                self.advance();
                Ok(Expr::Literal(Literal::Float(x)))
            }
            TokenKind::Str(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expr::Literal(Literal::Str(value)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            // Parenthesized expression
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }

            // Aggregate functions
            TokenKind::Keyword(kw) => {
                let Some(func) = keyword_to_aggregate(*kw) else {
                    return Err(self.unexpected("expression"));
                };
                self.advance();
                self.parse_aggregate_call(func)
            }

            // Column reference
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();

                if self.check(&TokenKind::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    return Ok(Expr::Column {
                        table: Some(name),
                        name: column,
                        pos,
                    });
                }

                Ok(Expr::Column {
                    table: None,
                    name,
                    pos,
                })
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parses the argument list of an aggregate call.
    ///
    /// `(*)` is accepted for COUNT only.
    fn parse_aggregate_call(&mut self, func: AggregateFunc) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LeftParen)?;

        let arg = if func == AggregateFunc::Count && self.check(&TokenKind::Star) {
            self.advance();
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Aggregate { func, arg })
    }

    /// Parses a comma-separated list of identifiers.
    fn parse_identifier_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut idents = vec![self.expect_identifier()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            idents.push(self.expect_identifier()?);
        }
        Ok(idents)
    }

    // --- Helper methods ---

    /// Returns the current token.
    fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// Returns the kind of the token `n` ahead of the current one.
    fn peek_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + n).map(|t| &t.kind)
    }

    /// Advances to the next token; the final EOF token is sticky.
    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current().kind) == core::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().as_keyword() == Some(keyword)
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// Expects and returns an identifier.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Builds an "unexpected token" error at the current position.
    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::unexpected(expected, self.current().kind.clone(), self.current().pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Position};

    fn parse(sql: &str) -> Result<Statement, ParseError> {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        Parser::new(tokens).parse_statement()
    }

    fn parse_all(sql: &str) -> Result<Vec<Statement>, ParseError> {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        Parser::new(tokens).parse_statements()
    }

    #[test]
    fn test_simple_select() {
        let stmt = parse("SELECT id, name FROM users").unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn test_select_with_where() {
        let stmt = parse("SELECT * FROM users WHERE id = 1").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert!(select.where_clause.is_some());
        assert!(matches!(select.items[0], SelectItem::Wildcard { table: None }));
    }

    #[test]
    fn test_select_qualified_wildcard() {
        let stmt = parse("SELECT u.* FROM users u").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert!(
            matches!(&select.items[0], SelectItem::Wildcard { table: Some(t) } if t == "u")
        );
    }

    #[test]
    fn test_select_with_join() {
        let stmt =
            parse("SELECT u.id, o.total FROM users u JOIN orders o ON u.id = o.user_id").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert_eq!(select.joins.len(), 1);
        assert_eq!(select.joins[0].kind, JoinKind::Inner);
        assert_eq!(select.joins[0].table.binding(), "o");
    }

    #[test]
    fn test_join_kinds() {
        for (sql, kind) in [
            ("SELECT * FROM a JOIN b ON a.x = b.x", JoinKind::Inner),
            ("SELECT * FROM a INNER JOIN b ON a.x = b.x", JoinKind::Inner),
            ("SELECT * FROM a LEFT JOIN b ON a.x = b.x", JoinKind::Left),
            ("SELECT * FROM a LEFT OUTER JOIN b ON a.x = b.x", JoinKind::Left),
            ("SELECT * FROM a RIGHT JOIN b ON a.x = b.x", JoinKind::Right),
            ("SELECT * FROM a FULL OUTER JOIN b ON a.x = b.x", JoinKind::Full),
        ] {
            let Statement::Select(select) = parse(sql).unwrap() else {
                panic!("Expected SELECT statement for {sql}");
            };
            assert_eq!(select.joins[0].kind, kind, "for {sql}");
        }
    }

    #[test]
    fn test_expression_precedence() {
        // 1 + 2 * 3 should be parsed as 1 + (2 * 3)
        let stmt = parse("SELECT 1 + 2 * 3 FROM t").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        let SelectItem::Expr { expr, .. } = &select.items[0] else {
            panic!("Expected expression item");
        };
        let Expr::Binary { op, right, .. } = expr else {
            panic!("Expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.as_ref(),
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let stmt = parse("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        let Some(Expr::Binary { op, .. }) = &select.where_clause else {
            panic!("Expected binary WHERE clause");
        };
        assert_eq!(*op, BinaryOp::Or);
    }

    #[test]
    fn test_between_desugars() {
        let stmt = parse("SELECT * FROM t WHERE age BETWEEN 18 AND 65").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        let Some(Expr::Binary { left, op, right }) = &select.where_clause else {
            panic!("Expected binary WHERE clause");
        };
        assert_eq!(*op, BinaryOp::And);
        assert!(matches!(
            left.as_ref(),
            Expr::Binary {
                op: BinaryOp::GtEq,
                ..
            }
        ));
        assert!(matches!(
            right.as_ref(),
            Expr::Binary {
                op: BinaryOp::LtEq,
                ..
            }
        ));
    }

    #[test]
    fn test_is_null() {
        let stmt = parse("SELECT * FROM t WHERE email IS NULL").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert!(matches!(
            select.where_clause,
            Some(Expr::IsNull { negated: false, .. })
        ));

        let stmt = parse("SELECT * FROM t WHERE email IS NOT NULL").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert!(matches!(
            select.where_clause,
            Some(Expr::IsNull { negated: true, .. })
        ));
    }

    #[test]
    fn test_group_by_and_order_by() {
        let stmt = parse(
            "SELECT u.name, COUNT(o.id) AS n FROM users u JOIN o ON u.id = o.uid \
             GROUP BY u.name ORDER BY u.name ASC",
        )
        .unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert_eq!(select.group_by.len(), 1);
        assert_eq!(select.group_by[0].to_string(), "u.name");
        assert_eq!(select.order_by.len(), 1);
        assert_eq!(select.order_by[0].direction, OrderDirection::Asc);

        let SelectItem::Expr { alias, expr } = &select.items[1] else {
            panic!("Expected expression item");
        };
        assert_eq!(alias.as_deref(), Some("n"));
        assert!(matches!(
            expr,
            Expr::Aggregate {
                func: AggregateFunc::Count,
                arg: Some(_)
            }
        ));
    }

    #[test]
    fn test_count_star() {
        let stmt = parse("SELECT COUNT(*) FROM users").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("Expected SELECT statement");
        };
        assert!(matches!(
            &select.items[0],
            SelectItem::Expr {
                expr: Expr::Aggregate {
                    func: AggregateFunc::Count,
                    arg: None
                },
                ..
            }
        ));
    }

    #[test]
    fn test_star_rejected_outside_count() {
        assert!(parse("SELECT SUM(*) FROM users").is_err());
    }

    #[test]
    fn test_insert_values() {
        let stmt = parse("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("Expected INSERT statement");
        };
        assert_eq!(insert.table, "users");
        assert_eq!(insert.columns, vec!["id", "name"]);
        assert_eq!(insert.rows.len(), 2);
        assert_eq!(insert.rows[0][1], Literal::Str(String::from("Alice")));
    }

    #[test]
    fn test_insert_without_column_list() {
        let stmt = parse("INSERT INTO users VALUES (1, 'Alice')").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("Expected INSERT statement");
        };
        assert!(insert.columns.is_empty());
    }

    #[test]
    fn test_insert_negative_and_null_literals() {
        let stmt = parse("INSERT INTO t VALUES (-3, -2.5, NULL, TRUE)").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("Expected INSERT statement");
        };
        assert_eq!(
            insert.rows[0],
            vec![
                Literal::Integer(-3),
                Literal::Float(-2.5),
                Literal::Null,
                Literal::Boolean(true),
            ]
        );
    }

    #[test]
    fn test_insert_rejects_identifier_values() {
        assert!(parse("INSERT INTO t VALUES (some_column)").is_err());
    }

    #[test]
    fn test_update() {
        let stmt = parse("UPDATE users SET name = 'Bob', age = age + 1 WHERE id = 1").unwrap();
        let Statement::Update(update) = stmt else {
            panic!("Expected UPDATE statement");
        };
        assert_eq!(update.table, "users");
        assert_eq!(update.assignments.len(), 2);
        assert!(update.where_clause.is_some());
    }

    #[test]
    fn test_delete() {
        let stmt = parse("DELETE FROM users WHERE id = 1").unwrap();
        let Statement::Delete(delete) = stmt else {
            panic!("Expected DELETE statement");
        };
        assert_eq!(delete.table, "users");
        assert!(delete.where_clause.is_some());
    }

    #[test]
    fn test_create_table() {
        let stmt = parse(
            "CREATE TABLE orders (id INT PRIMARY KEY, uid INT NOT NULL REFERENCES users(id), \
             note TEXT UNIQUE)",
        )
        .unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("Expected CREATE TABLE statement");
        };
        assert_eq!(create.name, "orders");
        assert_eq!(create.columns.len(), 3);
        assert!(create.columns[0].primary_key);
        assert!(create.columns[1].not_null);
        assert_eq!(
            create.columns[1].references,
            Some(ForeignKeyRef {
                table: String::from("users"),
                column: String::from("id"),
            })
        );
        assert!(create.columns[2].unique);
        assert_eq!(create.columns[2].data_type, TypeName::Text);
    }

    #[test]
    fn test_drop_table() {
        let stmt = parse("DROP TABLE users").unwrap();
        assert!(matches!(stmt, Statement::DropTable(d) if d.name == "users"));
    }

    #[test]
    fn test_statement_list() {
        let statements = parse_all(
            "CREATE TABLE t (id INT PRIMARY KEY); INSERT INTO t VALUES (1); SELECT * FROM t;",
        )
        .unwrap();
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[0], Statement::CreateTable(_)));
        assert!(matches!(statements[1], Statement::Insert(_)));
        assert!(matches!(statements[2], Statement::Select(_)));
    }

    #[test]
    fn test_error_reports_position_and_expectation() {
        let err = parse("SELECT FROM users").unwrap_err();
        assert_eq!(err.expected, "expression");
        assert_eq!(err.pos, Position::new(1, 8));
    }

    #[test]
    fn test_missing_statement_separator() {
        let err = parse_all("SELECT * FROM a SELECT * FROM b").unwrap_err();
        assert_eq!(err.expected, ";");
    }
}
