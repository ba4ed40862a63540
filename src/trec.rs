use std::fmt;
use std::io::{BufRead, Write};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::Tokenizer;
use crate::corpus::store::DocumentStore;
use crate::document::DocumentStatistics;
use crate::error::{RerankError, Result};
use crate::query::StructuredQuery;
use crate::scorer::{CalculationMode, DocumentScorer, ScoringModel};

/// One line of a TREC run file: `qid iter docno rank score run_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLine {
    pub qid: String,
    pub iter: String,
    pub docno: String,
    pub rank: String,
    pub score: f64,
    pub run_id: String,
}

impl RunLine {
    /// Parse one whitespace separated line. `line_no` is 1-based and only
    /// used for error reporting.
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(RerankError::MalformedSource {
                line: line_no,
                reason: format!("run line has {} fields, expected 6", fields.len()),
            });
        }
        let score = fields[4].parse::<f64>().map_err(|e| RerankError::MalformedSource {
            line: line_no,
            reason: format!("bad score {:?}: {e}", fields[4]),
        })?;
        Ok(Self {
            qid: fields[0].to_string(),
            iter: fields[1].to_string(),
            docno: fields[2].to_string(),
            rank: fields[3].to_string(),
            score,
            run_id: fields[5].to_string(),
        })
    }

    /// Same line with only the score replaced.
    pub fn with_score(&self, score: f64) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }
}

impl fmt::Display for RunLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.qid, self.iter, self.docno, self.rank, self.score, self.run_id
        )
    }
}

/// Read every non-blank line of a run file.
pub fn read_run<R: BufRead>(reader: R) -> Result<Vec<RunLine>> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push(RunLine::parse(&line, idx + 1)?);
    }
    Ok(lines)
}

pub fn write_run<W: Write>(mut writer: W, lines: &[RunLine]) -> Result<()> {
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Plain and structured query text of one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicQueries {
    pub plain: String,
    pub structured: String,
}

/// The three rescored copies of one input run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescoredRuns {
    /// basic Dirichlet, plain query
    pub basic: Vec<RunLine>,
    /// translation Dirichlet, plain query
    pub translation: Vec<RunLine>,
    /// translation Dirichlet, structured query
    pub structured: Vec<RunLine>,
}

/// Rescore a run three ways.
///
/// Every line keeps its position and fields. A line falls back to its
/// prior score in all three outputs when its topic is missing, when either
/// query of the topic cannot be built, or when the document field cannot
/// be fetched. A single failing formula only falls back in its own output.
pub fn rescore_run<S, T>(
    lines: &[RunLine],
    topics: &IndexMap<String, TopicQueries>,
    store: &S,
    field: &str,
    scorer: &DocumentScorer<'_>,
    tokenizer: &T,
    mode: CalculationMode,
) -> RescoredRuns
where
    S: DocumentStore + ?Sized,
    T: Tokenizer + ?Sized,
{
    let space = scorer.space();
    let mut queries: IndexMap<&str, Option<(StructuredQuery, StructuredQuery)>> = IndexMap::new();
    for line in lines {
        if queries.contains_key(line.qid.as_str()) {
            continue;
        }
        let built = match topics.get(&line.qid) {
            Some(topic) => StructuredQuery::build(&topic.plain, tokenizer, space)
                .and_then(|plain| Ok((plain, StructuredQuery::build(&topic.structured, tokenizer, space)?)))
                .map_err(|e| {
                    if e.is_recoverable() {
                        debug!(qid = %line.qid, error = %e, "topic queries unusable, keeping prior scores");
                    } else {
                        warn!(qid = %line.qid, error = %e, "topic queries failed, keeping prior scores");
                    }
                })
                .ok(),
            None => {
                warn!(qid = %line.qid, "no topic for run line, keeping prior scores");
                None
            }
        };
        queries.insert(line.qid.as_str(), built);
    }

    let rescored: Vec<[RunLine; 3]> = lines
        .par_iter()
        .map(|line| {
            let prior = || [line.clone(), line.clone(), line.clone()];
            let Some(Some((plain, structured))) = queries.get(line.qid.as_str()) else {
                return prior();
            };
            let Some(text) = store.field_text(&line.docno, field) else {
                warn!(docno = %line.docno, field, "document field missing, keeping prior scores");
                return prior();
            };
            let doc = DocumentStatistics::from_text(text, tokenizer);
            let rescore = |query: &StructuredQuery, model: ScoringModel| match scorer.score(query, &doc, model, mode) {
                Ok(score) => line.with_score(score),
                Err(e) => {
                    if e.is_recoverable() {
                        debug!(docno = %line.docno, ?model, error = %e, "keeping prior score");
                    } else {
                        warn!(docno = %line.docno, ?model, error = %e, "scoring failed, keeping prior score");
                    }
                    line.clone()
                }
            };
            [
                rescore(plain, ScoringModel::BasicDirichlet),
                rescore(plain, ScoringModel::TranslationDirichlet),
                rescore(structured, ScoringModel::TranslationDirichlet),
            ]
        })
        .collect();

    let mut runs = RescoredRuns {
        basic: Vec::with_capacity(lines.len()),
        translation: Vec::with_capacity(lines.len()),
        structured: Vec::with_capacity(lines.len()),
    };
    for [basic, translation, structured] in rescored {
        runs.basic.push(basic);
        runs.translation.push(translation);
        runs.structured.push(structured);
    }
    info!(lines = lines.len(), topics = queries.len(), "run rescored");
    runs
}

/// Keep the evaluation lines whose first field is `measure` (e.g. `P_10`).
pub fn filter_eval_lines<R: BufRead>(reader: R, measure: &str) -> Result<Vec<String>> {
    let mut kept = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.split_whitespace().next() == Some(measure) {
            kept.push(line);
        }
    }
    Ok(kept)
}
