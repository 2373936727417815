//! Search query parsing
//!
//! A subset of Lucene query-string syntax:
//!
//! - `coast mountains` - any clause may match (OR)
//! - `+coast -rain` - `+` must match, `-` must not match
//! - `sunny AND coast` - `AND` makes both neighbours required
//! - `NOT rain` - same as `-rain`
//! - `titulo:coast` - restrict a clause to one field
//! - `"to coast"` - phrase, matched as one string
//! - `coa*` - prefix wildcard
//! - `*` or an empty query - match everything
//!
//! Field names that are not indexed are treated as part of the free text.

use sqlx::{QueryBuilder, Sqlite};

/// Indexed fields addressable with `field:value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Titulo,
    Descripcion,
    Localizacion,
    Fecha,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Field::Id),
            "titulo" => Some(Field::Titulo),
            "descripcion" => Some(Field::Descripcion),
            "localizacion" => Some(Field::Localizacion),
            "fecha" => Some(Field::Fecha),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Titulo => "titulo",
            Field::Descripcion => "descripcion",
            Field::Localizacion => "localizacion",
            Field::Fecha => "fecha",
        }
    }
}

/// Text columns searched by clauses without a field
const FREE_TEXT_COLUMNS: [&str; 3] = ["titulo", "descripcion", "localizacion"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Should,
    Must,
    MustNot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occur,
    pub field: Option<Field>,
    pub value: String,
    pub prefix: bool,
}

/// A parsed query; no clauses means match-all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub clauses: Vec<Clause>,
}

impl SearchQuery {
    pub fn parse(input: &str) -> Self {
        let mut clauses: Vec<Clause> = Vec::new();
        let mut pending_must = false;
        let mut pending_not = false;

        for token in tokenize(input) {
            match token.as_str() {
                "AND" | "&&" => {
                    if let Some(prev) = clauses.last_mut() {
                        if prev.occur == Occur::Should {
                            prev.occur = Occur::Must;
                        }
                    }
                    pending_must = true;
                    continue;
                }
                "OR" | "||" => continue,
                "NOT" | "!" => {
                    pending_not = true;
                    continue;
                }
                _ => {}
            }

            let (mut occur, rest) = match token.chars().next() {
                Some('+') => (Occur::Must, &token[1..]),
                Some('-') => (Occur::MustNot, &token[1..]),
                _ => (Occur::Should, token.as_str()),
            };
            if pending_not {
                occur = Occur::MustNot;
            } else if pending_must && occur == Occur::Should {
                occur = Occur::Must;
            }
            pending_must = false;
            pending_not = false;

            if let Some(clause) = parse_clause(occur, rest) {
                clauses.push(clause);
            }
        }

        Self { clauses }
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append the WHERE clause (if any) to `qb`
    ///
    /// Must and must-not clauses are all required. Should clauses are
    /// required only when there is no must clause, and then at least one has
    /// to match.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let musts: Vec<&Clause> = self.by_occur(Occur::Must);
        let must_nots: Vec<&Clause> = self.by_occur(Occur::MustNot);
        let shoulds: Vec<&Clause> = if musts.is_empty() {
            self.by_occur(Occur::Should)
        } else {
            Vec::new()
        };

        if musts.is_empty() && must_nots.is_empty() && shoulds.is_empty() {
            return;
        }

        qb.push(" WHERE 1 = 1");
        for clause in musts {
            qb.push(" AND ");
            push_clause(qb, clause);
        }
        for clause in must_nots {
            qb.push(" AND NOT ");
            push_clause(qb, clause);
        }
        if !shoulds.is_empty() {
            qb.push(" AND (");
            for (i, clause) in shoulds.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_clause(qb, clause);
            }
            qb.push(")");
        }
    }

    fn by_occur(&self, occur: Occur) -> Vec<&Clause> {
        self.clauses.iter().filter(|c| c.occur == occur).collect()
    }
}

/// Split on whitespace, keeping quoted phrases together
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn parse_clause(occur: Occur, raw: &str) -> Option<Clause> {
    let (field, value) = match raw.split_once(':') {
        Some((name, value)) if !name.starts_with('"') => match Field::parse(name) {
            Some(field) => (Some(field), value),
            None if name == "*" && value == "*" => return None,
            None => (None, raw),
        },
        _ => (None, raw),
    };

    let quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    let (value, prefix) = if quoted {
        (value[1..value.len() - 1].to_string(), false)
    } else {
        let unquoted = value.trim_matches('"');
        match unquoted.strip_suffix('*') {
            Some(stem) => (stem.to_string(), true),
            None => (unquoted.to_string(), false),
        }
    };

    if value.is_empty() {
        // `*`, `field:*` and `""` constrain nothing
        return None;
    }

    Some(Clause {
        occur,
        field,
        value,
        prefix,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Optional columns are read through `COALESCE` so a NULL never turns a
/// clause into NULL, which `NOT` would otherwise drop.
fn push_like(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, pattern: String) {
    qb.push(format!("COALESCE({}, '') LIKE ", column));
    qb.push_bind(pattern);
    qb.push(" ESCAPE '\\'");
}

fn push_clause(qb: &mut QueryBuilder<'_, Sqlite>, clause: &Clause) {
    match clause.field {
        None => {
            let pattern = format!("%{}%", escape_like(&clause.value));
            qb.push("(");
            for (i, column) in FREE_TEXT_COLUMNS.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_like(qb, column, pattern.clone());
            }
            qb.push(")");
        }
        Some(Field::Id) => match clause.value.parse::<i64>() {
            Ok(id) => {
                qb.push("(id = ");
                qb.push_bind(id);
                qb.push(")");
            }
            Err(_) => {
                qb.push("(1 = 0)");
            }
        },
        Some(Field::Fecha) => {
            if clause.prefix {
                qb.push("(");
                push_like(qb, "fecha", format!("{}%", escape_like(&clause.value)));
                qb.push(")");
            } else {
                qb.push("(COALESCE(fecha, '') = ");
                qb.push_bind(clause.value.clone());
                qb.push(")");
            }
        }
        Some(field) => {
            qb.push("(");
            push_like(qb, field.column(), format!("%{}%", escape_like(&clause.value)));
            qb.push(")");
        }
    }
}
