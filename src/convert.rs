//! Per-notice conversion: run every extractor, fold fragments in registry order.
//!
//! Failures stay inside their term. An extractor error is recorded and the
//! term contributes nothing; the remaining terms still merge.
use crate::engine::ReconciliationEngine;
use crate::error::ReconcileError;
use crate::prune::prune_release;
use crate::release::ReleaseDocument;
use crate::report::{ConversionReport, Warning, WarningKind};
use crate::spec::MergeSpec;
use crate::terms::{Extractor, TermRegistry};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of converting one notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub release: ReleaseDocument,
    pub report: ConversionReport,
}

pub struct Converter<'r> {
    registry: &'r TermRegistry,
    engine: ReconciliationEngine,
    prune: bool,
    notice_id: Option<String>,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r TermRegistry) -> Self {
        Self {
            registry,
            engine: ReconciliationEngine::new(),
            prune: true,
            notice_id: None,
        }
    }

    pub fn with_engine(mut self, engine: ReconciliationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn notice_id(mut self, notice_id: Option<String>) -> Self {
        self.notice_id = notice_id;
        self
    }

    /// Convert one notice.
    ///
    /// Extractors run in the registry's order regardless of the order they are
    /// passed in. Extractors for unregistered terms merge afterwards, in the
    /// order given, under the base spec only.
    pub fn convert<S: ?Sized>(
        &self,
        source: &S,
        extractors: &[&dyn Extractor<S>],
    ) -> Conversion {
        let mut by_term: BTreeMap<&str, Vec<&dyn Extractor<S>>> = BTreeMap::new();
        for extractor in extractors {
            by_term
                .entry(extractor.term_id())
                .or_default()
                .push(*extractor);
        }

        let mut release = ReleaseDocument::new();
        let mut report = ConversionReport {
            notice_id: self.notice_id.clone(),
            ..ConversionReport::default()
        };

        for term in self.registry.iter() {
            for extractor in by_term.remove(term.id()).unwrap_or_default() {
                self.run_term(&mut release, &mut report, source, extractor, term.spec());
            }
        }

        let unregistered = MergeSpec::new();
        for extractor in extractors {
            if !by_term.contains_key(extractor.term_id()) {
                continue;
            }
            let term = extractor.term_id();
            tracing::warn!(term, "no merge spec registered for term");
            report.warnings.push(Warning::new(
                WarningKind::UnregisteredTerm,
                Some(term),
                "",
                format!("term {term} is not registered; merged with release-wide rules only"),
            ));
            self.run_term(&mut release, &mut report, source, *extractor, &unregistered);
        }

        if self.prune {
            release = prune_release(release);
            report.pruned = true;
        }

        tracing::info!(
            notice = report.notice_id.as_deref().unwrap_or("-"),
            applied = report.terms_applied.len(),
            empty = report.terms_empty.len(),
            failed = report.terms_failed.len(),
            warnings = report.warnings.len(),
            "converted notice"
        );
        Conversion { release, report }
    }

    /// Merge already-extracted fragments, for callers that ran extraction elsewhere.
    pub fn merge_fragments<'f, I>(&self, fragments: I) -> Conversion
    where
        I: IntoIterator<Item = (&'f str, Option<&'f Value>)>,
    {
        let fragments: Vec<(&str, Option<&Value>)> = fragments.into_iter().collect();
        let extractors: Vec<Fixed<'_>> = fragments
            .iter()
            .map(|(term, fragment)| Fixed {
                term: *term,
                fragment: *fragment,
            })
            .collect();
        let dyn_extractors: Vec<&dyn Extractor<()>> = extractors
            .iter()
            .map(|extractor| extractor as &dyn Extractor<()>)
            .collect();
        self.convert(&(), &dyn_extractors)
    }

    fn run_term<S: ?Sized>(
        &self,
        release: &mut ReleaseDocument,
        report: &mut ConversionReport,
        source: &S,
        extractor: &dyn Extractor<S>,
        spec: &MergeSpec,
    ) {
        let term = extractor.term_id();
        match extractor.extract(source) {
            Ok(Some(fragment)) => {
                let merge = self.engine.apply(release, term, Some(&fragment), spec);
                report.record_merge(term, merge);
            }
            Ok(None) => {
                tracing::debug!(term, "term absent from notice");
                report.terms_empty.push(term.to_string());
            }
            Err(err) => {
                let failure = ReconcileError::ExtractorFailure {
                    term: term.to_string(),
                    message: format!("{err:#}"),
                };
                tracing::warn!(term, error = %failure, "extractor failed");
                report.terms_failed.push(term.to_string());
                report.warnings.push(Warning::from_error(Some(term), &failure));
            }
        }
    }
}

/// Extractor replaying a fragment produced earlier.
struct Fixed<'f> {
    term: &'f str,
    fragment: Option<&'f Value>,
}

impl Extractor<()> for Fixed<'_> {
    fn term_id(&self) -> &str {
        self.term
    }

    fn extract(&self, _source: &()) -> anyhow::Result<Option<Value>> {
        Ok(self.fragment.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::Converter;
    use crate::report::WarningKind;
    use crate::terms::{extractor_fn, Extractor, TermRegistry};
    use anyhow::anyhow;
    use serde_json::{json, Value};

    /// Minimal notice stand-in: term id to raw value.
    type Notice = Vec<(&'static str, Value)>;

    fn field<'n>(notice: &'n Notice, term: &str) -> Option<&'n Value> {
        notice
            .iter()
            .find(|(candidate, _)| *candidate == term)
            .map(|(_, value)| value)
    }

    fn notice() -> Notice {
        vec![
            ("BT-21-Lot", json!("Roads")),
            ("BT-137-Lot", json!("LOT-0001")),
        ]
    }

    #[test]
    fn extractors_run_in_registry_order() {
        let registry = TermRegistry::builtin().expect("builtin registry");
        let title = extractor_fn("BT-21-Lot", |notice: &Notice| {
            Ok(field(notice, "BT-21-Lot").map(|title| {
                json!({ "tender": { "lots": [{ "id": "LOT-0001", "title": title }] } })
            }))
        });
        let lot = extractor_fn("BT-137-Lot", |notice: &Notice| {
            Ok(field(notice, "BT-137-Lot")
                .map(|id| json!({ "tender": { "lots": [{ "id": id }] } })))
        });

        let conversion =
            Converter::new(&registry).convert(&notice(), &[&title as &dyn Extractor<Notice>, &lot]);
        assert_eq!(conversion.report.terms_applied, ["BT-137-Lot", "BT-21-Lot"]);
        assert_eq!(conversion.report.entities_created, 1);
        assert_eq!(
            conversion.release.get("tender.lots"),
            Some(&json!([{ "id": "LOT-0001", "title": "Roads" }]))
        );
    }

    #[test]
    fn failing_extractor_is_isolated_to_its_term() {
        let registry = TermRegistry::builtin().expect("builtin registry");
        let broken = extractor_fn("BT-24-Lot", |_: &Notice| Err(anyhow!("bad xpath")));
        let lot = extractor_fn("BT-137-Lot", |notice: &Notice| {
            Ok(field(notice, "BT-137-Lot")
                .map(|id| json!({ "tender": { "lots": [{ "id": id }] } })))
        });
        let missing = extractor_fn("BT-27-Lot", |notice: &Notice| {
            Ok(field(notice, "BT-27-Lot").cloned())
        });

        let conversion = Converter::new(&registry).convert(
            &notice(),
            &[&broken as &dyn Extractor<Notice>, &lot, &missing],
        );
        let report = &conversion.report;
        assert_eq!(report.terms_failed, ["BT-24-Lot"]);
        assert_eq!(report.terms_empty, ["BT-27-Lot"]);
        assert_eq!(report.warning_count(WarningKind::ExtractorFailure), 1);
        assert!(report.warnings[0].message.contains("bad xpath"));
        assert_eq!(
            conversion.release.get("tender.lots"),
            Some(&json!([{ "id": "LOT-0001" }]))
        );
    }

    #[test]
    fn unregistered_terms_merge_last_with_a_warning() {
        let registry = TermRegistry::builtin().expect("builtin registry");
        let fragments = [
            ("BT-99999-Custom", Some(json!({ "tender": { "title": "Custom" } }))),
            ("BT-21-Lot", Some(json!({ "tender": { "lots": [{ "id": "LOT-1", "title": "A" }] } }))),
        ];
        let conversion = Converter::new(&registry).merge_fragments(
            fragments
                .iter()
                .map(|(term, fragment)| (*term, fragment.as_ref())),
        );
        assert_eq!(conversion.report.terms_applied, ["BT-21-Lot", "BT-99999-Custom"]);
        assert_eq!(conversion.report.warning_count(WarningKind::UnregisteredTerm), 1);
        assert_eq!(conversion.release.get("tender.title"), Some(&json!("Custom")));
    }

    #[test]
    fn pruning_runs_once_at_the_end_unless_disabled() {
        let registry = TermRegistry::builtin().expect("builtin registry");
        let fragment = json!({ "tender": { "lots": [{ "id": "LOT-1", "techniques": {} }] } });
        let fragments = [("BT-765-Lot", Some(&fragment))];

        let pruned = Converter::new(&registry).merge_fragments(fragments);
        assert!(pruned.report.pruned);
        assert_eq!(pruned.release.get("tender.lots"), Some(&json!([{ "id": "LOT-1" }])));

        let raw = Converter::new(&registry).prune(false).merge_fragments(fragments);
        assert!(!raw.report.pruned);
        assert_eq!(
            raw.release.get("tender.lots"),
            Some(&json!([{ "id": "LOT-1", "techniques": {} }]))
        );
    }
}
