//! `+soliton:` directive tokenizer.
//!
//! Directives appear in struct doc comments (aggregate level) and in struct
//! tags (field level). The tokenizer turns each occurrence into a closed
//! [`Directive`] value; folding into annotation records happens in `to_ir`.

/// Prefix introducing a directive.
pub const DIRECTIVE_PREFIX: &str = "+soliton:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Aggregate,
    BaseEntity(String),
    ManyToMany,
    /// `ref` on a field, `ref(Target)` on a field or an aggregate.
    Ref(Option<String>),
    Unique,
    Required,
    Entity,
    /// `valueObject` or `valueObject(strategy=name)`.
    ValueObject(Option<String>),
    Index,
    Enum(Vec<String>),
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Aggregate => "aggregate",
            Directive::BaseEntity(_) => "baseEntity",
            Directive::ManyToMany => "manyToMany",
            Directive::Ref(_) => "ref",
            Directive::Unique => "unique",
            Directive::Required => "required",
            Directive::Entity => "entity",
            Directive::ValueObject(_) => "valueObject",
            Directive::Index => "index",
            Directive::Enum(_) => "enum",
        }
    }

    /// Whether the directive may appear in a struct doc comment.
    pub fn is_aggregate_level(&self) -> bool {
        matches!(
            self,
            Directive::Aggregate
                | Directive::BaseEntity(_)
                | Directive::ManyToMany
                | Directive::Ref(Some(_))
        )
    }

    /// Whether the directive may appear in a struct tag.
    pub fn is_field_level(&self) -> bool {
        !matches!(
            self,
            Directive::Aggregate | Directive::BaseEntity(_) | Directive::ManyToMany
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    Unknown(String),
    Malformed { directive: String, message: String },
}

/// Scans `text` for every `+soliton:` directive, in order.
pub fn scan(text: &str) -> Result<Vec<Directive>, DirectiveError> {
    let mut directives = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(DIRECTIVE_PREFIX) {
        let after = &rest[start + DIRECTIVE_PREFIX.len()..];
        let name_len = after
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(after.len());
        let name = &after[..name_len];
        let mut tail = &after[name_len..];

        let args = if let Some(open) = tail.strip_prefix('(') {
            let close = open.find(')').ok_or_else(|| DirectiveError::Malformed {
                directive: name.to_string(),
                message: "missing closing ')'".to_string(),
            })?;
            if open[..close].contains('(') {
                return Err(DirectiveError::Malformed {
                    directive: name.to_string(),
                    message: "nested '(' in argument list".to_string(),
                });
            }
            tail = &open[close + 1..];
            Some(&open[..close])
        } else {
            None
        };

        directives.push(build(name, args)?);
        rest = tail;
    }

    Ok(directives)
}

fn build(name: &str, args: Option<&str>) -> Result<Directive, DirectiveError> {
    let malformed = |message: &str| DirectiveError::Malformed {
        directive: name.to_string(),
        message: message.to_string(),
    };
    let no_args = |directive: Directive| match args {
        None => Ok(directive),
        Some(_) => Err(malformed("takes no arguments")),
    };

    match name {
        "aggregate" => no_args(Directive::Aggregate),
        "manyToMany" => no_args(Directive::ManyToMany),
        "unique" => no_args(Directive::Unique),
        "required" => no_args(Directive::Required),
        "entity" => no_args(Directive::Entity),
        "index" => no_args(Directive::Index),
        "baseEntity" => {
            let arg = args.map(str::trim).ok_or_else(|| malformed("expects a trait name"))?;
            if !is_identifier(arg) {
                return Err(malformed("trait name must be an identifier"));
            }
            Ok(Directive::BaseEntity(arg.to_string()))
        }
        "ref" => match args.map(str::trim) {
            None => Ok(Directive::Ref(None)),
            Some(target) if is_identifier(target) => Ok(Directive::Ref(Some(target.to_string()))),
            Some(_) => Err(malformed("target must be an aggregate name")),
        },
        "valueObject" => match args.map(str::trim) {
            None => Ok(Directive::ValueObject(None)),
            Some(arg) => {
                let strategy = arg
                    .strip_prefix("strategy")
                    .map(str::trim_start)
                    .and_then(|s| s.strip_prefix('='))
                    .map(str::trim)
                    .filter(|s| is_identifier(s))
                    .ok_or_else(|| malformed("expected strategy=<name>"))?;
                Ok(Directive::ValueObject(Some(strategy.to_string())))
            }
        },
        "enum" => {
            let arg = args.ok_or_else(|| malformed("expects a value list"))?;
            let values: Vec<String> = arg
                .trim()
                .trim_matches('"')
                .split(',')
                .map(|v| v.trim().trim_matches('"').trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if values.is_empty() {
                return Err(malformed("value list is empty"));
            }
            Ok(Directive::Enum(values))
        }
        other => Err(DirectiveError::Unknown(other.to_string())),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Extracts the value of `key:"..."` from a Go struct tag.
pub fn tag_value<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{}:\"", key);
    let mut search = tag;
    while let Some(pos) = search.find(&needle) {
        let boundary = pos == 0 || search[..pos].ends_with(char::is_whitespace);
        let value_start = &search[pos + needle.len()..];
        if boundary {
            let end = value_start.find('"')?;
            return Some(&value_start[..end]);
        }
        search = value_start;
    }
    None
}
