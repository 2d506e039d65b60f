//! Mapping of Commons `imageinfo` pages to [`ImageMetadata`].

use crate::domain::ImageMetadata;
use scraper::Html;
use serde_json::Value;
use tracing::warn;

/// `extmetadata` keys requested alongside `imageinfo`.
pub const EXTMETADATA_FILTER: &str =
    "License|LicenseUrl|Attribution|Artist|ImageDescription|ObjectName|Title";

/// Plain text of an HTML fragment with whitespace collapsed. `None` when
/// nothing readable is left.
pub fn clean_html(html: Option<&str>) -> Option<String> {
    let html = html?.trim();
    if html.is_empty() {
        return None;
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn ext_value<'a>(ext: &'a Value, key: &str) -> Option<&'a str> {
    ext.get(key)?.get("value")?.as_str()
}

/// Metadata of one page, or `None` when it carries no usable image info.
pub fn extract_image_metadata(page: &Value) -> Option<ImageMetadata> {
    let page_title = page.get("title")?.as_str()?;
    let info = page.get("imageinfo")?.get(0)?;
    let ext = info.get("extmetadata").unwrap_or(&Value::Null);

    let (Some(url), Some(width), Some(height), Some(mime), Some(size)) = (
        info.get("url").and_then(Value::as_str),
        info.get("width").and_then(Value::as_i64),
        info.get("height").and_then(Value::as_i64),
        info.get("mime").and_then(Value::as_str),
        info.get("size").and_then(Value::as_i64),
    ) else {
        warn!("Skipping {}: incomplete imageinfo", page_title);
        return None;
    };

    // ObjectName reads better than the file name when present.
    let raw_title = ext_value(ext, "ObjectName")
        .map(str::to_string)
        .unwrap_or_else(|| page_title.trim_start_matches("File:").to_string());
    let title = clean_html(Some(&raw_title)).unwrap_or(raw_title);

    Some(ImageMetadata {
        commons_id: page_title.to_string(),
        commons_url: url.to_string(),
        title,
        description: clean_html(ext_value(ext, "ImageDescription")),
        author: clean_html(ext_value(ext, "Artist")),
        license: ext_value(ext, "License")
            .map(str::to_string)
            .unwrap_or_else(|| "unknown".to_string()),
        license_url: ext_value(ext, "LicenseUrl").map(str::to_string),
        width,
        height,
        mime_type: mime.to_string(),
        file_size: size,
    })
}

/// Every usable page of a `query.pages` response, in search rank order when
/// the response carries one.
pub fn pages_metadata(body: &Value) -> Vec<ImageMetadata> {
    let Some(pages) = body.pointer("/query/pages").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut ranked: Vec<(i64, ImageMetadata)> = pages
        .values()
        .filter_map(|page| {
            let rank = page.get("index").and_then(Value::as_i64).unwrap_or(i64::MAX);
            extract_image_metadata(page).map(|m| (rank, m))
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(title: &str, index: i64) -> Value {
        json!({
            "title": title,
            "index": index,
            "imageinfo": [{
                "url": format!("https://upload.wikimedia.org/{title}"),
                "width": 800, "height": 600, "mime": "image/jpeg", "size": 1024,
                "extmetadata": {
                    "Artist": {"value": "<a href=\"//commons.wikimedia.org/wiki/User:X\">Jane   Doe</a>"},
                    "License": {"value": "cc-by-sa-4.0"},
                    "ImageDescription": {"value": "<p>The <b>Culebra</b> Cut, 1913</p>"}
                }
            }]
        })
    }

    #[test]
    fn html_fields_are_reduced_to_text() {
        let meta = extract_image_metadata(&page("File:Culebra.jpg", 1)).unwrap();
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.description.as_deref(), Some("The Culebra Cut, 1913"));
        assert_eq!(meta.title, "Culebra.jpg");
        assert_eq!(meta.commons_id, "File:Culebra.jpg");
        assert_eq!(meta.license, "cc-by-sa-4.0");
    }

    #[test]
    fn object_name_is_preferred_for_title() {
        let mut p = page("File:IMG_0001.jpg", 1);
        p["imageinfo"][0]["extmetadata"]["ObjectName"] = json!({"value": "Gatun Locks"});
        assert_eq!(extract_image_metadata(&p).unwrap().title, "Gatun Locks");
    }

    #[test]
    fn pages_without_imageinfo_are_skipped_and_rank_kept() {
        let body = json!({"query": {"pages": {
            "10": page("File:B.jpg", 2),
            "11": {"title": "File:Missing.jpg", "missing": ""},
            "12": page("File:A.jpg", 1)
        }}});
        let titles: Vec<_> = pages_metadata(&body).into_iter().map(|m| m.commons_id).collect();
        assert_eq!(titles, vec!["File:A.jpg", "File:B.jpg"]);
        assert!(pages_metadata(&json!({"batchcomplete": ""})).is_empty());
    }

    #[test]
    fn blank_html_is_none() {
        assert_eq!(clean_html(Some("  <br/> ")), None);
        assert_eq!(clean_html(None), None);
    }
}
