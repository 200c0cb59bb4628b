//! Mention detection

use snapback_core::{PostRecord, POST_COLLECTION};

/// Whether `record` is a post that mentions `self_did` through a rich-text facet
///
/// Plain-text handles without a mention facet do not count.
pub fn is_mentioned(record: &PostRecord, self_did: &str) -> bool {
    if record.record_type != POST_COLLECTION {
        return false;
    }

    record.facets.as_deref().is_some_and(|facets| {
        facets
            .iter()
            .flat_map(|facet| facet.features.iter())
            .any(|feature| feature.mentions(self_did))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapback_core::{Facet, FacetFeature};

    const BOT: &str = "did:plc:bot";

    fn post(facets: Option<Vec<Facet>>) -> PostRecord {
        PostRecord {
            record_type: POST_COLLECTION.to_string(),
            text: "hey @bot.test".to_string(),
            facets,
            ..Default::default()
        }
    }

    fn facet(features: Vec<FacetFeature>) -> Facet {
        Facet {
            index: None,
            features,
        }
    }

    #[test]
    fn test_no_facets_never_matches() {
        assert!(!is_mentioned(&post(None), BOT));
        assert!(!is_mentioned(&post(None), ""));
        assert!(!is_mentioned(&post(Some(vec![])), BOT));
    }

    #[test]
    fn test_mention_of_self_matches() {
        let record = post(Some(vec![facet(vec![FacetFeature::mention(BOT)])]));
        assert!(is_mentioned(&record, BOT));
    }

    #[test]
    fn test_mention_of_someone_else() {
        let record = post(Some(vec![facet(vec![FacetFeature::mention("did:plc:other")])]));
        assert!(!is_mentioned(&record, BOT));
    }

    #[test]
    fn test_mention_in_later_facet() {
        let link = FacetFeature {
            feature_type: "app.bsky.richtext.facet#link".to_string(),
            did: None,
        };
        let record = post(Some(vec![
            facet(vec![link]),
            facet(vec![FacetFeature::mention("did:plc:other"), FacetFeature::mention(BOT)]),
        ]));
        assert!(is_mentioned(&record, BOT));
    }

    #[test]
    fn test_non_mention_feature_with_matching_did() {
        let odd = FacetFeature {
            feature_type: "app.bsky.richtext.facet#tag".to_string(),
            did: Some(BOT.to_string()),
        };
        assert!(!is_mentioned(&post(Some(vec![facet(vec![odd])])), BOT));
    }

    #[test]
    fn test_wrong_record_type() {
        let mut record = post(Some(vec![facet(vec![FacetFeature::mention(BOT)])]));
        record.record_type = "app.bsky.feed.repost".to_string();
        assert!(!is_mentioned(&record, BOT));
    }
}
