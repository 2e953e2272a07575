//! Evaluator for the select dialect emitted by the query compiler.
//!
//! Supported grammar:
//!
//! ```text
//! SELECT (* | COUNT(*) | itemName()) FROM domain
//!     [WHERE condition] [ORDER BY operand [ASC | DESC]] [LIMIT n]
//!
//! condition := or
//! or        := inter (OR inter)*
//! inter     := and (intersection and)*
//! and       := unary (AND unary)*
//! unary     := NOT unary | '(' condition ')' | predicate
//! operand   := `name` | itemName() | EVERY(`name`)
//! predicate := operand (= | != | < | <= | > | >= | LIKE | NOT LIKE) "text"
//!            | operand IN ("text", ...)
//!            | operand BETWEEN "text" AND "text"
//!            | operand IS [NOT] NULL
//! ```
//!
//! Values compare as strings. A predicate on a multi-valued attribute holds
//! when any value satisfies it, or every value for `EVERY(...)`.

use super::{SelectPage, StoreError, StoreResult, StoredItem, COUNT_ATTRIBUTE};
use sdbsync_engine::{FlatAttribute, SortOrder};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Largest page a select may return.
pub const MAX_PAGE_SIZE: usize = 2500;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Name(String),
    Text(String),
    Symbol(&'static str),
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::InvalidSelect(message.into())
}

fn tokenize(input: &str) -> StoreResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '`' => {
                chars.next();
                tokens.push(Token::Name(quoted(&mut chars, '`')?));
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Text(quoted(&mut chars, c)?));
            }
            '(' | ')' | ',' | '*' | '=' => {
                chars.next();
                tokens.push(Token::Symbol(match c {
                    '(' => "(",
                    ')' => ")",
                    ',' => ",",
                    '*' => "*",
                    _ => "=",
                }));
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(invalid("expected '=' after '!'"));
                }
                tokens.push(Token::Symbol("!="));
            }
            '<' | '>' => {
                chars.next();
                let with_eq = chars.next_if_eq(&'=').is_some();
                tokens.push(Token::Symbol(match (c, with_eq) {
                    ('<', true) => "<=",
                    ('<', false) => "<",
                    (_, true) => ">=",
                    (_, false) => ">",
                }));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    word.push(c);
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(invalid(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

/// Read up to the closing `quote`; a doubled quote is a literal one.
fn quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> StoreResult<String> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => {
                if chars.next_if_eq(&quote).is_some() {
                    text.push(quote);
                } else {
                    return Ok(text);
                }
            }
            Some(c) => text.push(c),
            None => return Err(invalid("unterminated quoted text")),
        }
    }
}

/// What a select returns per matching item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    All,
    ItemNames,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    ItemName,
    Every(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl CompareOp {
    fn apply(self, value: &str, literal: &str) -> bool {
        match self {
            CompareOp::Eq => value == literal,
            CompareOp::Ne => value != literal,
            CompareOp::Lt => value < literal,
            CompareOp::Le => value <= literal,
            CompareOp::Gt => value > literal,
            CompareOp::Ge => value >= literal,
            CompareOp::Like => like(value, literal),
            CompareOp::NotLike => !like(value, literal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Intersection(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare {
        operand: Operand,
        op: CompareOp,
        literal: String,
    },
    In {
        operand: Operand,
        literals: Vec<String>,
    },
    Between {
        operand: Operand,
        low: String,
        high: String,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
}

impl Condition {
    fn eval(&self, item: &StoredItem) -> bool {
        match self {
            Condition::And(a, b) | Condition::Intersection(a, b) => a.eval(item) && b.eval(item),
            Condition::Or(a, b) => a.eval(item) || b.eval(item),
            Condition::Not(inner) => !inner.eval(item),
            Condition::Compare {
                operand,
                op,
                literal,
            } => holds(operand, item, |v| op.apply(v, literal)),
            Condition::In { operand, literals } => {
                holds(operand, item, |v| literals.iter().any(|l| l == v))
            }
            Condition::Between {
                operand,
                low,
                high,
            } => holds(operand, item, |v| low.as_str() <= v && v <= high.as_str()),
            Condition::IsNull { operand, negated } => {
                let present = match operand {
                    Operand::ItemName => true,
                    Operand::Attribute(name) | Operand::Every(name) => {
                        values(item, name).next().is_some()
                    }
                };
                present == *negated
            }
        }
    }
}

fn values<'a>(item: &'a StoredItem, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    item.attributes
        .iter()
        .filter(move |a| a.name == name)
        .map(|a| a.value.as_str())
}

fn holds(operand: &Operand, item: &StoredItem, predicate: impl Fn(&str) -> bool) -> bool {
    match operand {
        Operand::ItemName => predicate(&item.name),
        Operand::Attribute(name) => values(item, name).any(predicate),
        Operand::Every(name) => {
            let mut found = values(item, name).peekable();
            found.peek().is_some() && found.all(predicate)
        }
    }
}

/// `%` matches any run of characters; everything else is literal.
fn like(value: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    let [first, middle @ .., last] = parts.as_slice() else {
        return value == pattern;
    };
    let Some(mut rest) = value.strip_prefix(first) else {
        return false;
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// A parsed select expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    output: Output,
    domain: String,
    condition: Option<Condition>,
    order: Option<(Operand, SortOrder)>,
    limit: Option<usize>,
}

impl SelectStatement {
    pub fn parse(expression: &str) -> StoreResult<Self> {
        let tokens = tokenize(expression)?;
        Parser { tokens, pos: 0 }.statement()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn output(&self) -> Output {
        self.output
    }

    pub fn matches(&self, item: &StoredItem) -> bool {
        self.condition.as_ref().map_or(true, |c| c.eval(item))
    }

    /// Filter, sort and page `items`, all of which belong to [`Self::domain`].
    pub fn execute(
        &self,
        items: impl IntoIterator<Item = StoredItem>,
        next_token: Option<&str>,
        default_page_size: usize,
    ) -> StoreResult<SelectPage> {
        let mut matched: Vec<StoredItem> = items.into_iter().filter(|i| self.matches(i)).collect();

        match &self.order {
            Some((operand, order)) => matched.sort_by(|a, b| {
                let ordering = compare_by(operand, a, b);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            }),
            None => matched.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        if self.output == Output::Count {
            let count = self.limit.map_or(matched.len(), |l| matched.len().min(l));
            return Ok(SelectPage {
                items: vec![StoredItem {
                    name: self.domain.clone(),
                    attributes: vec![FlatAttribute::new(COUNT_ATTRIBUTE, count.to_string())],
                }],
                next_token: None,
            });
        }

        let total = matched.len();
        let offset = next_token.map(decode_token).transpose()?.unwrap_or(0);
        let page_size = self
            .limit
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let end = offset.saturating_add(page_size).min(total);

        let mut items: Vec<StoredItem> = if offset < total {
            matched.drain(offset..end).collect()
        } else {
            Vec::new()
        };
        if self.output == Output::ItemNames {
            for item in &mut items {
                item.attributes.clear();
            }
        }

        Ok(SelectPage {
            items,
            next_token: (end < total).then(|| encode_token(end)),
        })
    }
}

fn sort_key<'a>(operand: &'a Operand, item: &'a StoredItem) -> Option<&'a str> {
    match operand {
        Operand::ItemName => Some(&item.name),
        Operand::Attribute(name) | Operand::Every(name) => values(item, name).min(),
    }
}

/// Items missing the sort attribute go last.
fn compare_by(operand: &Operand, a: &StoredItem, b: &StoredItem) -> Ordering {
    match (sort_key(operand, a), sort_key(operand, b)) {
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

fn encode_token(offset: usize) -> String {
    format!("{offset:08x}")
}

fn decode_token(token: &str) -> StoreResult<usize> {
    usize::from_str_radix(token, 16).map_err(|_| StoreError::InvalidToken)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        let found = self.is_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> StoreResult<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(invalid(format!("expected {keyword}")))
        }
    }

    fn symbol(&mut self, symbol: &str) -> bool {
        let found = matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_symbol(&mut self, symbol: &str) -> StoreResult<()> {
        if self.symbol(symbol) {
            Ok(())
        } else {
            Err(invalid(format!("expected '{symbol}'")))
        }
    }

    fn text(&mut self) -> StoreResult<String> {
        match self.advance() {
            Some(Token::Text(text)) => Ok(text),
            _ => Err(invalid("expected quoted value")),
        }
    }

    fn statement(mut self) -> StoreResult<SelectStatement> {
        self.expect_keyword("SELECT")?;
        let output = if self.symbol("*") {
            Output::All
        } else if self.keyword("COUNT") {
            self.expect_symbol("(")?;
            self.expect_symbol("*")?;
            self.expect_symbol(")")?;
            Output::Count
        } else if self.keyword("itemName") {
            self.expect_symbol("(")?;
            self.expect_symbol(")")?;
            Output::ItemNames
        } else {
            return Err(invalid("expected *, COUNT(*) or itemName()"));
        };

        self.expect_keyword("FROM")?;
        let domain = match self.advance() {
            Some(Token::Name(name)) | Some(Token::Word(name)) => name,
            _ => return Err(invalid("expected domain name")),
        };

        let condition = if self.keyword("WHERE") {
            Some(self.or()?)
        } else {
            None
        };

        let order = if self.keyword("ORDER") {
            self.expect_keyword("BY")?;
            let operand = self.operand()?;
            let order = if self.keyword("DESC") {
                SortOrder::Desc
            } else {
                self.keyword("ASC");
                SortOrder::Asc
            };
            Some((operand, order))
        } else {
            None
        };

        let limit = if self.keyword("LIMIT") {
            match self.advance() {
                Some(Token::Word(n)) => Some(
                    n.parse()
                        .map_err(|_| invalid(format!("invalid LIMIT '{n}'")))?,
                ),
                _ => return Err(invalid("expected LIMIT value")),
            }
        } else {
            None
        };

        if let Some(token) = self.peek() {
            return Err(invalid(format!("unexpected trailing {token:?}")));
        }

        Ok(SelectStatement {
            output,
            domain,
            condition,
            order,
            limit,
        })
    }

    fn or(&mut self) -> StoreResult<Condition> {
        let mut left = self.intersection()?;
        while self.keyword("OR") {
            let right = self.intersection()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn intersection(&mut self) -> StoreResult<Condition> {
        let mut left = self.and()?;
        while self.keyword("intersection") {
            let right = self.and()?;
            left = Condition::Intersection(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> StoreResult<Condition> {
        let mut left = self.unary()?;
        while self.keyword("AND") {
            let right = self.unary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> StoreResult<Condition> {
        if self.keyword("NOT") {
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }
        if self.symbol("(") {
            let inner = self.or()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }
        self.predicate()
    }

    fn operand(&mut self) -> StoreResult<Operand> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(Operand::Attribute(name)),
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("itemName") => {
                self.expect_symbol("(")?;
                self.expect_symbol(")")?;
                Ok(Operand::ItemName)
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("EVERY") => {
                self.expect_symbol("(")?;
                let name = match self.advance() {
                    Some(Token::Name(name)) | Some(Token::Word(name)) => name,
                    _ => return Err(invalid("expected attribute name in EVERY()")),
                };
                self.expect_symbol(")")?;
                Ok(Operand::Every(name))
            }
            Some(Token::Word(word)) => Ok(Operand::Attribute(word)),
            other => Err(invalid(format!("expected attribute, found {other:?}"))),
        }
    }

    fn predicate(&mut self) -> StoreResult<Condition> {
        let operand = self.operand()?;

        let op = match self.peek() {
            Some(Token::Symbol("=")) => Some(CompareOp::Eq),
            Some(Token::Symbol("!=")) => Some(CompareOp::Ne),
            Some(Token::Symbol("<")) => Some(CompareOp::Lt),
            Some(Token::Symbol("<=")) => Some(CompareOp::Le),
            Some(Token::Symbol(">")) => Some(CompareOp::Gt),
            Some(Token::Symbol(">=")) => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let literal = self.text()?;
            return Ok(Condition::Compare {
                operand,
                op,
                literal,
            });
        }

        if self.keyword("LIKE") {
            let literal = self.text()?;
            return Ok(Condition::Compare {
                operand,
                op: CompareOp::Like,
                literal,
            });
        }
        if self.keyword("NOT") {
            self.expect_keyword("LIKE")?;
            let literal = self.text()?;
            return Ok(Condition::Compare {
                operand,
                op: CompareOp::NotLike,
                literal,
            });
        }
        if self.keyword("IN") {
            self.expect_symbol("(")?;
            let mut literals = vec![self.text()?];
            while self.symbol(",") {
                literals.push(self.text()?);
            }
            self.expect_symbol(")")?;
            return Ok(Condition::In { operand, literals });
        }
        if self.keyword("BETWEEN") {
            let low = self.text()?;
            self.expect_keyword("AND")?;
            let high = self.text()?;
            return Ok(Condition::Between { operand, low, high });
        }
        if self.keyword("IS") {
            let negated = self.keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Condition::IsNull { operand, negated });
        }

        Err(invalid("expected comparison"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, pairs: &[(&str, &str)]) -> StoredItem {
        StoredItem {
            name: name.to_string(),
            attributes: pairs
                .iter()
                .map(|(n, v)| FlatAttribute::new(*n, *v))
                .collect(),
        }
    }

    fn clients() -> Vec<StoredItem> {
        vec![
            item("a", &[("age", "052"), ("colors", "red"), ("colors", "blue")]),
            item("b", &[("age", "039"), ("colors", "red")]),
            item("c", &[("age", "048"), ("colors", "[]"), ("name", "Chung")]),
            item("d", &[("name", "Chen"), ("colors", "null")]),
        ]
    }

    fn names(page: &SelectPage) -> Vec<&str> {
        page.items.iter().map(|i| i.name.as_str()).collect()
    }

    fn run(expression: &str) -> Vec<String> {
        let statement = SelectStatement::parse(expression).unwrap();
        let page = statement.execute(clients(), None, 100).unwrap();
        names(&page).into_iter().map(String::from).collect()
    }

    #[test]
    fn parse_statement_parts() {
        let statement = SelectStatement::parse(
            r#"SELECT * FROM `Clients` WHERE `age` >= "039" ORDER BY `age` DESC LIMIT 10"#,
        )
        .unwrap();
        assert_eq!(statement.domain(), "Clients");
        assert_eq!(statement.output(), Output::All);
        assert_eq!(statement.limit, Some(10));
        assert_eq!(
            statement.order,
            Some((Operand::Attribute("age".into()), SortOrder::Desc))
        );

        let count = SelectStatement::parse("select count(*) from `Clients`").unwrap();
        assert_eq!(count.output(), Output::Count);
    }

    #[test]
    fn quoted_names_and_values_unescape() {
        let statement =
            SelectStatement::parse(r#"SELECT * FROM `Odd``Name` WHERE `a` = "say ""hi""""#).unwrap();
        assert_eq!(statement.domain(), "Odd`Name");
        assert_eq!(
            statement.condition,
            Some(Condition::Compare {
                operand: Operand::Attribute("a".into()),
                op: CompareOp::Eq,
                literal: "say \"hi\"".into(),
            })
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expression in [
            "",
            "DELETE FROM `Clients`",
            "SELECT * FROM",
            r#"SELECT * FROM `Clients` WHERE `a` = "open"#,
            "SELECT * FROM `Clients` WHERE `a` =",
            "SELECT * FROM `Clients` LIMIT many",
            "SELECT * FROM `Clients` WHERE `a` ! \"1\"",
            "SELECT * FROM `Clients` extra",
        ] {
            assert!(
                matches!(SelectStatement::parse(expression), Err(StoreError::InvalidSelect(_))),
                "accepted: {expression}"
            );
        }
    }

    #[test]
    fn any_value_matches() {
        assert_eq!(run(r#"SELECT * FROM `C` WHERE `colors` = "blue""#), vec!["a"]);
        assert_eq!(run(r#"SELECT * FROM `C` WHERE `colors` = "red""#), vec!["a", "b"]);
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `colors` != "red""#),
            vec!["a", "c", "d"]
        );
    }

    #[test]
    fn every_requires_all_values() {
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE EVERY(`colors`) = "red""#),
            vec!["b"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE EVERY(`missing`) = "red""#),
            Vec::<String>::new()
        );
    }

    #[test]
    fn ranges_and_membership() {
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `age` BETWEEN "043" AND "053""#),
            vec!["a", "c"]
        );
        assert_eq!(run(r#"SELECT * FROM `C` WHERE `age` < "040""#), vec!["b"]);
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `name` IN ("Chen","Lee")"#),
            vec!["d"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE itemName() IN ("a","c")"#),
            vec!["a", "c"]
        );
    }

    #[test]
    fn presence_and_null_sentinel() {
        assert_eq!(run("SELECT * FROM `C` WHERE `name` IS NULL"), vec!["a", "b"]);
        assert_eq!(run("SELECT * FROM `C` WHERE `name` IS NOT NULL"), vec!["c", "d"]);
        assert_eq!(run(r#"SELECT * FROM `C` WHERE `colors` = "null""#), vec!["d"]);
    }

    #[test]
    fn like_patterns() {
        assert!(like("Chung", "Ch%"));
        assert!(like("Chung", "%ung"));
        assert!(like("Chung", "%hu%"));
        assert!(like("Chung", "C%n%"));
        assert!(like("Chung", "%"));
        assert!(like("Chung", "Chung"));
        assert!(!like("Chung", "Chen%"));
        assert!(!like("Chung", "%x%"));
        assert!(!like("ab", "a%b%b"));
        assert_eq!(run(r#"SELECT * FROM `C` WHERE `name` LIKE "Ch%""#), vec!["c", "d"]);
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `name` NOT LIKE "%ung""#),
            vec!["d"]
        );
    }

    #[test]
    fn boolean_composition() {
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `age` > "045" AND `colors` = "red""#),
            vec!["a"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `age` < "040" OR `name` = "Chen""#),
            vec!["b", "d"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `colors` = "red" intersection `colors` = "blue""#),
            vec!["a"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE (NOT(`colors` = "red")) AND `name` IS NOT NULL"#),
            vec!["c", "d"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE NOT `age` = "052""#),
            vec!["b", "c", "d"]
        );
    }

    #[test]
    fn order_by_value() {
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `age` IS NOT NULL ORDER BY `age`"#),
            vec!["b", "c", "a"]
        );
        assert_eq!(
            run(r#"SELECT * FROM `C` WHERE `age` IS NOT NULL ORDER BY `age` DESC"#),
            vec!["a", "c", "b"]
        );
        assert_eq!(
            run("SELECT * FROM `C` ORDER BY itemName() DESC"),
            vec!["d", "c", "b", "a"]
        );
    }

    #[test]
    fn pages_follow_tokens() {
        let statement = SelectStatement::parse("SELECT * FROM `C` LIMIT 3").unwrap();
        let first = statement.execute(clients(), None, 100).unwrap();
        assert_eq!(names(&first), vec!["a", "b", "c"]);
        let token = first.next_token.clone().unwrap();

        let second = statement.execute(clients(), Some(&token), 100).unwrap();
        assert_eq!(names(&second), vec!["d"]);
        assert_eq!(second.next_token, None);

        assert!(matches!(
            statement.execute(clients(), Some("not-a-token"), 100),
            Err(StoreError::InvalidToken)
        ));

        let default_size = SelectStatement::parse("SELECT * FROM `C`").unwrap();
        let page = default_size.execute(clients(), None, 2).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_token.is_some());
    }

    #[test]
    fn count_reports_matches() {
        let statement =
            SelectStatement::parse(r#"SELECT COUNT(*) FROM `C` WHERE `colors` = "red""#).unwrap();
        let page = statement.execute(clients(), None, 100).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.items[0].attributes,
            vec![FlatAttribute::new(COUNT_ATTRIBUTE, "2")]
        );
    }

    #[test]
    fn item_names_output_drops_attributes() {
        let statement = SelectStatement::parse("SELECT itemName() FROM `C`").unwrap();
        let page = statement.execute(clients(), None, 100).unwrap();
        assert_eq!(page.items.len(), 4);
        assert!(page.items.iter().all(|i| i.attributes.is_empty()));
    }
}
