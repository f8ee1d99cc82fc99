use std::time::Duration;

use rig::completion::CompletionModel;
use scraper::Html;
use tracing::{debug, error, warn};
use url::Url;

use super::record::{AnalysisRecord, SiteStatus, UrlState};
use crate::classifier::TechnologyClassifier;
use crate::error::SiteError;
use crate::extractor::ContentExtractor;
use crate::fetcher::{FetchStrategy, PageFetcher};
use crate::language::{self, UNKNOWN_LANGUAGE};
use crate::summarizer::Summarizer;

/// Read-only handles shared by every worker
pub(crate) struct Pipeline<M: CompletionModel> {
    pub(crate) fetcher: PageFetcher,
    pub(crate) extractor: ContentExtractor,
    pub(crate) classifier: TechnologyClassifier,
    pub(crate) summarizer: Summarizer<M>,
    pub(crate) strategy: FetchStrategy,
    /// Bounds the fetch stage; enrichment is bounded by the detector and
    /// summarizer budgets, so a reachable site keeps its status code
    pub(crate) fetch_deadline: Duration,
}

impl<M: CompletionModel> Pipeline<M> {
    /// Run one URL to a terminal state. Never fails.
    pub(crate) async fn analyze(&self, url: &str) -> AnalysisRecord {
        let mut state = UrlState::Pending;

        advance(&mut state, UrlState::Fetching, url);
        let fetch = self.fetcher.fetch_with_strategy(url, self.strategy);
        let fetched = match tokio::time::timeout(self.fetch_deadline, fetch).await {
            Ok(fetched) => fetched,
            Err(_) => {
                error!("Error analyzing {}: {}", url, SiteError::Timeout(self.fetch_deadline.as_secs()));
                advance(&mut state, UrlState::Failed, url);
                return AnalysisRecord::timed_out(url);
            }
        };
        if let Some(failure) = &fetched.failure {
            error!("Error analyzing {}: {}", url, failure);
            advance(&mut state, UrlState::Failed, url);
            return AnalysisRecord::fetch_failed(url);
        }

        let html = match fetched.html.as_deref() {
            Some(html) if fetched.is_extractable() => html,
            _ => {
                debug!("{} answered {}; skipping extraction", url, fetched.status_code);
                advance(&mut state, UrlState::Done, url);
                return AnalysisRecord::not_ok(url, fetched.status_code);
            }
        };

        advance(&mut state, UrlState::Extracting, url);
        let base = match Url::parse(url) {
            Ok(base) => base,
            Err(e) => {
                error!("Error analyzing {}: {}", url, SiteError::UnknownException(e.to_string()));
                advance(&mut state, UrlState::Failed, url);
                return AnalysisRecord::unknown(url);
            }
        };
        let content = self.extractor.extract(html, &base, &fetched.form_fields);
        if content.is_empty() {
            warn!("{}: {}", url, SiteError::ExtractionEmpty);
        }
        let language = {
            let document = Html::parse_document(html);
            language::declared_language(&document, &fetched.headers)
        }
        .map(|code| language::resolve(&code))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

        advance(&mut state, UrlState::Enriching, url);
        let platforms = self.classifier.classify(html, &fetched.headers, url).await;
        let summary = self.summarizer.summarize(&content.text).await;

        advance(&mut state, UrlState::Done, url);
        AnalysisRecord {
            url: url.to_string(),
            summary,
            language,
            status: SiteStatus::Code(fetched.status_code),
            platforms,
        }
    }
}

fn advance(state: &mut UrlState, next: UrlState, url: &str) {
    debug_assert!(!state.is_terminal(), "{url} left terminal state {state}");
    debug!(from = %state, to = %next, "{}", url);
    *state = next;
}
