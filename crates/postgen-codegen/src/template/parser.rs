//! Template source to node tree.
//!
//! Block tags (`#if`, `else`, `/if`, `#each`, `/each`) and comments that sit
//! alone on a line take the whole line with them, so templates can be laid
//! out one tag per line without leaving blank lines in the output.

use super::helpers::Helper;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Expr(Expr),
    If {
        cond: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        path: String,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Path(String),
    Call { helper: Helper, args: Vec<Arg> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Path(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("line {line}: unterminated tag")]
    UnterminatedTag { line: usize },
    #[error("line {line}: unterminated string literal")]
    UnterminatedLiteral { line: usize },
    #[error("line {line}: empty tag")]
    EmptyTag { line: usize },
    #[error("line {line}: malformed tag `{tag}`")]
    Malformed { tag: String, line: usize },
    #[error("line {line}: unknown helper `{name}`")]
    UnknownHelper { name: String, line: usize },
    #[error("line {line}: `{helper}` takes {expected} argument(s), found {found}")]
    Arity {
        helper: &'static str,
        expected: usize,
        found: usize,
        line: usize,
    },
    #[error("line {line}: `{tag}` without a matching block")]
    Unexpected { tag: &'static str, line: usize },
    #[error("line {line}: unclosed `#{block}` block")]
    Unclosed { block: &'static str, line: usize },
}

#[derive(Debug)]
enum Tag {
    Expr(Expr),
    If(String),
    Each(String),
    Else,
    EndIf,
    EndEach,
}

impl Tag {
    fn is_block(&self) -> bool {
        !matches!(self, Tag::Expr(_))
    }
}

#[derive(Debug)]
enum Token {
    Text(String),
    Tag { tag: Tag, line: usize },
    Comment,
}

impl Token {
    fn standalone_candidate(&self) -> bool {
        match self {
            Token::Tag { tag, .. } => tag.is_block(),
            Token::Comment => true,
            Token::Text(_) => false,
        }
    }
}

pub(crate) fn parse(source: &str) -> Result<Vec<Node>, SyntaxError> {
    let mut tokens = tokenize(source)?;
    trim_standalone(&mut tokens);
    let mut iter = tokens.into_iter();
    let (nodes, end) = parse_nodes(&mut iter)?;
    match end {
        None => Ok(nodes),
        Some((term, line)) => Err(SyntaxError::Unexpected {
            tag: term.name(),
            line,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Else,
    EndIf,
    EndEach,
}

impl Terminator {
    fn name(self) -> &'static str {
        match self {
            Terminator::Else => "else",
            Terminator::EndIf => "/if",
            Terminator::EndEach => "/each",
        }
    }
}

type Parsed = (Vec<Node>, Option<(Terminator, usize)>);

/// Parse nodes up to the next terminator tag or the end of input.
fn parse_nodes(tokens: &mut impl Iterator<Item = Token>) -> Result<Parsed, SyntaxError> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        let (tag, line) = match token {
            Token::Text(text) => {
                if !text.is_empty() {
                    nodes.push(Node::Text(text));
                }
                continue;
            }
            Token::Comment => continue,
            Token::Tag { tag, line } => (tag, line),
        };

        match tag {
            Tag::Expr(expr) => nodes.push(Node::Expr(expr)),
            Tag::Else => return Ok((nodes, Some((Terminator::Else, line)))),
            Tag::EndIf => return Ok((nodes, Some((Terminator::EndIf, line)))),
            Tag::EndEach => return Ok((nodes, Some((Terminator::EndEach, line)))),
            Tag::If(cond) => {
                let (then, end) = parse_nodes(tokens)?;
                let otherwise = match end {
                    Some((Terminator::EndIf, _)) => Vec::new(),
                    Some((Terminator::Else, _)) => {
                        let (otherwise, end) = parse_nodes(tokens)?;
                        match end {
                            Some((Terminator::EndIf, _)) => otherwise,
                            Some((term, at)) => return Err(unexpected(term, at)),
                            None => return Err(SyntaxError::Unclosed { block: "if", line }),
                        }
                    }
                    Some((term, at)) => return Err(unexpected(term, at)),
                    None => return Err(SyntaxError::Unclosed { block: "if", line }),
                };
                nodes.push(Node::If {
                    cond,
                    then,
                    otherwise,
                });
            }
            Tag::Each(path) => {
                let (body, end) = parse_nodes(tokens)?;
                match end {
                    Some((Terminator::EndEach, _)) => nodes.push(Node::Each { path, body }),
                    Some((term, at)) => return Err(unexpected(term, at)),
                    None => return Err(SyntaxError::Unclosed { block: "each", line }),
                }
            }
        }
    }

    Ok((nodes, None))
}

fn unexpected(term: Terminator, line: usize) -> SyntaxError {
    SyntaxError::Unexpected {
        tag: term.name(),
        line,
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;

    while let Some(start) = rest.find("{{") {
        let text = &rest[..start];
        line += text.matches('\n').count();
        tokens.push(Token::Text(text.to_string()));

        let after = &rest[start + 2..];
        let end = find_close(after).ok_or(SyntaxError::UnterminatedTag { line })?;
        let inner = &after[..end];

        if inner.trim_start().starts_with('!') {
            tokens.push(Token::Comment);
        } else {
            tokens.push(Token::Tag {
                tag: parse_tag(inner.trim(), line)?,
                line,
            });
        }

        line += inner.matches('\n').count();
        rest = &after[end + 2..];
    }

    tokens.push(Token::Text(rest.to_string()));
    Ok(tokens)
}

/// Offset of the closing `}}`, skipping over quoted literals.
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b'}' if !in_quote && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_tag(inner: &str, line: usize) -> Result<Tag, SyntaxError> {
    if inner.is_empty() {
        return Err(SyntaxError::EmptyTag { line });
    }
    let malformed = || SyntaxError::Malformed {
        tag: inner.to_string(),
        line,
    };

    if let Some(block) = inner.strip_prefix('#') {
        let (keyword, path) = block.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let path = path.trim();
        if path.is_empty() || path.contains(char::is_whitespace) {
            return Err(malformed());
        }
        return match keyword {
            "if" => Ok(Tag::If(path.to_string())),
            "each" => Ok(Tag::Each(path.to_string())),
            _ => Err(malformed()),
        };
    }

    match inner {
        "else" => return Ok(Tag::Else),
        "/if" => return Ok(Tag::EndIf),
        "/each" => return Ok(Tag::EndEach),
        _ if inner.starts_with('/') => return Err(malformed()),
        _ => {}
    }

    let mut words = split_words(inner, line)?.into_iter();
    let Some(Word::Bare(head)) = words.next() else {
        return Err(malformed());
    };
    let args: Vec<Arg> = words
        .map(|w| match w {
            Word::Bare(path) => Arg::Path(path),
            Word::Quoted(text) => Arg::Literal(text),
        })
        .collect();

    if args.is_empty() {
        return Ok(Tag::Expr(Expr::Path(head)));
    }

    let helper = Helper::from_name(&head).ok_or_else(|| SyntaxError::UnknownHelper {
        name: head.clone(),
        line,
    })?;
    if args.len() != helper.arity() {
        return Err(SyntaxError::Arity {
            helper: helper.name(),
            expected: helper.arity(),
            found: args.len(),
            line,
        });
    }
    Ok(Tag::Expr(Expr::Call { helper, args }))
}

enum Word {
    Bare(String),
    Quoted(String),
}

fn split_words(inner: &str, line: usize) -> Result<Vec<Word>, SyntaxError> {
    let mut words = Vec::new();
    let mut chars = inner.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    None => return Err(SyntaxError::UnterminatedLiteral { line }),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => literal.push('\n'),
                        Some('t') => literal.push('\t'),
                        Some(other) => literal.push(other),
                        None => return Err(SyntaxError::UnterminatedLiteral { line }),
                    },
                    Some(other) => literal.push(other),
                }
            }
            words.push(Word::Quoted(literal));
        } else {
            let mut bare = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                bare.push(c);
                chars.next();
            }
            words.push(Word::Bare(bare));
        }
    }
    Ok(words)
}

/// Drop the line of every block tag or comment that stands alone on it.
///
/// Tokens alternate text/tag, so a tag's neighbours are at `i - 1` and
/// `i + 1`. Standalone-ness is decided against the untrimmed text first, then
/// all trims are applied.
fn trim_standalone(tokens: &mut [Token]) {
    let text_at = |tokens: &[Token], i: usize| match tokens.get(i) {
        Some(Token::Text(t)) => Some(t.clone()),
        _ => None,
    };

    let mut standalone = Vec::new();
    for i in 0..tokens.len() {
        if !tokens[i].standalone_candidate() {
            continue;
        }
        let before = if i == 0 { None } else { text_at(tokens, i - 1) };
        let after = text_at(tokens, i + 1);
        let line_start = match before {
            Some(t) => {
                let tail = t.rsplit('\n').next().unwrap_or("");
                is_blank(tail) && (t.contains('\n') || i == 1)
            }
            None => i == 0,
        };
        let line_end = match after {
            Some(t) => {
                let head = t.trim_start_matches([' ', '\t']);
                head.starts_with('\n') || head.starts_with("\r\n") || (head.is_empty() && i + 2 == tokens.len())
            }
            None => true,
        };
        if line_start && line_end {
            standalone.push(i);
        }
    }

    for &i in &standalone {
        if let Some(Token::Text(t)) = tokens.get_mut(i + 1) {
            let head = t.trim_start_matches([' ', '\t']);
            let head = head
                .strip_prefix("\r\n")
                .or_else(|| head.strip_prefix('\n'))
                .unwrap_or(head);
            *t = head.to_string();
        }
    }
    for &i in &standalone {
        if i == 0 {
            continue;
        }
        if let Some(Token::Text(t)) = tokens.get_mut(i - 1) {
            let keep = t.rfind('\n').map(|p| p + 1).unwrap_or(0);
            t.truncate(keep);
        }
    }
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t')
}
