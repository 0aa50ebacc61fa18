//! PubMed efetch XML → [`LiteratureRecord`].
//!
//! Element lookups are document-wide: the first `Affiliation` anywhere is the
//! primary affiliation, every `Author` is a collaborator candidate, and every
//! `AffiliationInfo/Affiliation` is a location mention.

use kolscope_core::{AFFILIATION_NOT_FOUND, LiteratureRecord, TITLE_NOT_FOUND, Work, YEAR_NOT_FOUND};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::dates::normalize_date;
use crate::error::{Result, ScienceError};

/// Name parts of one `Author` element, each `None` when absent or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAuthor {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
}

impl ParsedAuthor {
    pub fn new(fore_name: &str, last_name: &str) -> Self {
        Self {
            last_name: Some(last_name.to_string()),
            fore_name: Some(fore_name.to_string()),
        }
    }

    /// `"ForeName LastName"`, only when both parts are present.
    pub fn display_name(&self) -> Option<String> {
        match (&self.fore_name, &self.last_name) {
            (Some(fore), Some(last)) => Some(format!("{fore} {last}")),
            _ => None,
        }
    }
}

/// Pair the i-th author with the i-th affiliation mention.
///
/// The two sequences are independent document-wide lists, so the i-th
/// mention does not necessarily belong to the i-th author. Pairing stops at
/// the shorter list. Authors without both name parts are dropped together
/// with their paired mention.
pub fn pair_authors_positionally(
    authors: &[ParsedAuthor],
    mentions: &[String],
) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut locations = Vec::new();
    for (author, mention) in authors.iter().zip(mentions) {
        let Some(name) = author.display_name() else {
            continue;
        };
        names.push(name);
        if !mention.is_empty() {
            locations.push(mention.clone());
        }
    }
    (names, locations)
}

// ─── Event walk ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Affiliation { in_info: bool },
    LastName,
    ForeName,
    ArticleTitle,
    PubDateYear,
    PubDate,
}

struct ActiveCapture {
    capture: Capture,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct ArticleState {
    title: Option<String>,
    year: Option<String>,
    pub_date: Option<String>,
    capturing_title: bool,
}

#[derive(Default)]
struct DocumentState {
    first_affiliation: Option<String>,
    mentions: Vec<String>,
    authors: Vec<ParsedAuthor>,
    works: Vec<Work>,
    author: Option<(usize, ParsedAuthor)>,
    article: Option<ArticleState>,
}

impl DocumentState {
    fn finish_capture(&mut self, active: ActiveCapture) {
        let text = match active.capture {
            Capture::ArticleTitle | Capture::PubDate => collapse_whitespace(&active.text),
            _ => active.text.trim().to_string(),
        };
        match active.capture {
            Capture::Affiliation { in_info } => {
                if self.first_affiliation.is_none() {
                    self.first_affiliation = Some(text.clone());
                }
                if in_info {
                    self.mentions.push(text);
                }
            }
            Capture::LastName => {
                if let Some((_, author)) = self.author.as_mut() {
                    author.last_name = non_empty(text);
                }
            }
            Capture::ForeName => {
                if let Some((_, author)) = self.author.as_mut() {
                    author.fore_name = non_empty(text);
                }
            }
            Capture::ArticleTitle => {
                if let Some(article) = self.article.as_mut() {
                    article.title = non_empty(text);
                    article.capturing_title = false;
                }
            }
            Capture::PubDateYear => {
                if let Some(article) = self.article.as_mut() {
                    article.year = non_empty(text);
                }
            }
            Capture::PubDate => {
                if let Some(article) = self.article.as_mut() {
                    article.pub_date = Some(text);
                }
            }
        }
    }

    fn capture_for(&mut self, name: &str, parent: Option<&str>) -> Option<Capture> {
        match name {
            "Affiliation" => Some(Capture::Affiliation {
                in_info: parent == Some("AffiliationInfo"),
            }),
            "LastName" if parent == Some("Author") && self.author.is_some() => {
                Some(Capture::LastName)
            }
            "ForeName" if parent == Some("Author") && self.author.is_some() => {
                Some(Capture::ForeName)
            }
            "ArticleTitle" => {
                let article = self.article.as_mut()?;
                if article.title.is_some() || article.capturing_title {
                    return None;
                }
                article.capturing_title = true;
                Some(Capture::ArticleTitle)
            }
            "Year" if parent == Some("PubDate") => {
                let article = self.article.as_ref()?;
                article.year.is_none().then_some(Capture::PubDateYear)
            }
            "PubDate" => {
                let article = self.article.as_ref()?;
                article.pub_date.is_none().then_some(Capture::PubDate)
            }
            _ => None,
        }
    }

    fn finish_article(&mut self) {
        if let Some(article) = self.article.take() {
            let published = article
                .pub_date
                .as_deref()
                .map(normalize_date)
                .unwrap_or_else(|| normalize_date(""));
            self.works.push(Work {
                title: article.title.unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
                year: article.year.unwrap_or_else(|| YEAR_NOT_FOUND.to_string()),
                published,
            });
        }
    }

    fn into_record(self) -> LiteratureRecord {
        let affiliation = self
            .first_affiliation
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| AFFILIATION_NOT_FOUND.to_string());
        let (collaborator_names, geographic_mentions) =
            pair_authors_positionally(&self.authors, &self.mentions);
        LiteratureRecord {
            affiliation,
            collaborator_names,
            geographic_mentions,
            works: self.works,
        }
    }
}

/// Parse an efetch `PubmedArticleSet` document.
pub fn parse_literature_xml(xml: &str) -> Result<LiteratureRecord> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut active: Vec<ActiveCapture> = Vec::new();
    let mut doc = DocumentState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let parent = stack.last().cloned();
                stack.push(name.clone());
                let depth = stack.len();

                match name.as_str() {
                    "PubmedArticle" => doc.article = Some(ArticleState::default()),
                    "Author" => doc.author = Some((depth, ParsedAuthor::default())),
                    _ => {}
                }
                if let Some(capture) = doc.capture_for(&name, parent.as_deref()) {
                    active.push(ActiveCapture {
                        capture,
                        depth,
                        text: String::new(),
                    });
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let parent = stack.last().map(String::as_str);
                match name.as_str() {
                    "Affiliation" => doc.finish_capture(ActiveCapture {
                        capture: Capture::Affiliation {
                            in_info: parent == Some("AffiliationInfo"),
                        },
                        depth: stack.len() + 1,
                        text: String::new(),
                    }),
                    "Author" => doc.authors.push(ParsedAuthor::default()),
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| ScienceError::Parse(format!("invalid PubMed text: {err}")))?;
                append_text(&mut active, &text);
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                append_text(&mut active, &String::from_utf8_lossy(&bytes));
            }
            Ok(Event::End(_)) => {
                let depth = stack.len();
                let name = stack.pop().unwrap_or_default();

                while active.last().is_some_and(|a| a.depth >= depth) {
                    if let Some(done) = active.pop() {
                        doc.finish_capture(done);
                    }
                }

                match name.as_str() {
                    "Author" => {
                        if let Some((author_depth, author)) = doc.author.take() {
                            if author_depth == depth {
                                doc.authors.push(author);
                            } else {
                                doc.author = Some((author_depth, author));
                            }
                        }
                    }
                    "PubmedArticle" => doc.finish_article(),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ScienceError::Parse(format!(
                    "invalid PubMed XML at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    Ok(doc.into_record())
}

fn append_text(active: &mut [ActiveCapture], text: &str) {
    for capture in active.iter_mut() {
        if capture.capture == Capture::PubDate {
            capture.text.push(' ');
        }
        capture.text.push_str(text);
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
