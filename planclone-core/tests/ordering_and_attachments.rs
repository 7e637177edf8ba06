//! Sibling ordering and attachment-key behaviour on realistic inputs.

use planclone_core::{
    attachment::{self, NormalizeError},
    order_key::{order_by_key, ranks},
    Bucket, BucketId, OrderKey,
};
use rstest::rstest;

fn bucket(id: &str, key: &str) -> Bucket {
    Bucket {
        id: BucketId::from(id),
        name: format!("bucket {id}"),
        order_key: OrderKey::from(key),
    }
}

#[test]
fn buckets_with_service_style_keys_order_by_pivot() {
    let buckets = vec![
        bucket("todo", "8585269235419217847"),
        bucket("doing", "8585269235419217849"),
        bucket("done", "8585269235419217848"),
    ];
    let ordered: Vec<_> = order_by_key(buckets, |b| b.order_key.as_str())
        .into_iter()
        .map(|b| b.id.0)
        .collect();
    assert_eq!(ordered, vec!["doing", "done", "todo"]);
}

#[test]
fn end_to_end_bucket_example() {
    assert_eq!(ranks(&["aab", "aac"]), vec![1, 0]);
}

#[rstest]
#[case("https://example.com/a.pdf")]
#[case("https://contoso.sharepoint.com/sites/x/Shared%20Documents/y.xlsx")]
#[case("https%253A%252F%252Fexample.com%252Fdeep%252Fz.txt")]
fn normalized_keys_are_single_encoded_absolute_urls(#[case] raw: &str) {
    let normalized = attachment::normalize(raw, "doc").expect("normalize");
    let url = normalized.key.url();
    assert!(url.starts_with("https://"), "decoded form must be absolute: {url}");
    assert_eq!(
        attachment::decode_fully(normalized.key.as_str()).value,
        url,
        "one decode pass must recover the URL"
    );
    assert_eq!(
        urlencoding::decode(normalized.key.as_str()).expect("decode").into_owned(),
        url
    );
}

#[test]
fn relative_reference_is_rejected_with_alias() {
    let err = attachment::normalize("docs%2Fnotes.txt", "Meeting notes").unwrap_err();
    let NormalizeError::NotAbsolute { alias, value, .. } = &err;
    assert_eq!(alias, "Meeting notes");
    assert_eq!(value, "docs/notes.txt");
    assert!(err.to_string().contains("Meeting notes"));
}
