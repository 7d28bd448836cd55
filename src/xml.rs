//! Blob service XML bodies.
//!
//! The REST client sends one XML request body (Put Block List) and parses
//! several XML responses: container and blob enumerations, block lists,
//! page range lists, and error documents.  Rendering uses the `quick-xml`
//! writer; enumerations and block lists go through `quick_xml::de`, page
//! lists through the pull reader because their `PageRange` and `ClearRange`
//! elements interleave.

use std::collections::BTreeMap;
use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Deserialize;

use crate::errors::{BlobError, Result};
use crate::options::{parse_http_date, AccessTier, BlobType, PageRange, PublicAccessType};
use crate::storage::backend::{BlobItem, Block, BlockList, ContainerItem, PageList};

fn xml_error(err: impl std::fmt::Display) -> BlobError {
    BlobError::Internal(anyhow::anyhow!("malformed XML: {}", err))
}

// ── Put Block List ──────────────────────────────────────────────────

/// Render the `<BlockList>` body committing `block_ids` in order.
///
/// ```xml
/// <?xml version="1.0" encoding="utf-8"?>
/// <BlockList>
///   <Latest>AAAA</Latest>
///   <Latest>AAAB</Latest>
/// </BlockList>
/// ```
///
/// `Latest` lets the service pick the newest version of each id, staged or
/// committed.
pub fn render_block_list(block_ids: &[String]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("BlockList")))
        .map_err(xml_error)?;
    for id in block_ids {
        write_text_element(&mut writer, "Latest", id)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("BlockList")))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
}

/// Write a `<tag>text</tag>` element.
fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(xml_error)?;
    Ok(())
}

// ── Enumerations ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    containers: Option<ContainersXml>,
    #[serde(default)]
    blobs: Option<BlobsXml>,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainersXml {
    #[serde(rename = "Container", default)]
    items: Vec<ContainerXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerXml {
    name: String,
    #[serde(default)]
    properties: Option<ContainerPropertiesXml>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ContainerPropertiesXml {
    #[serde(rename = "Last-Modified", default)]
    last_modified: Option<String>,
    #[serde(rename = "Etag", default)]
    etag: Option<String>,
    #[serde(rename = "PublicAccess", default)]
    public_access: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobsXml {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobXml {
    name: String,
    #[serde(default)]
    snapshot: Option<String>,
    #[serde(default)]
    deleted: Option<bool>,
    #[serde(default)]
    properties: Option<BlobPropertiesXml>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct BlobPropertiesXml {
    #[serde(rename = "Last-Modified", default)]
    last_modified: Option<String>,
    #[serde(rename = "Etag", default)]
    etag: Option<String>,
    #[serde(rename = "Content-Length", default)]
    content_length: Option<u64>,
    #[serde(rename = "Content-Type", default)]
    content_type: Option<String>,
    #[serde(rename = "BlobType", default)]
    blob_type: Option<String>,
    #[serde(rename = "AccessTier", default)]
    access_tier: Option<String>,
}

/// One page of an enumeration plus the marker of the next page, if any.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_marker: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a List Containers response page.
pub fn parse_container_list(body: &str) -> Result<Page<ContainerItem>> {
    let results: EnumerationResults = quick_xml::de::from_str(body).map_err(xml_error)?;
    let items = results
        .containers
        .map(|c| c.items)
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let props = c.properties;
            ContainerItem {
                name: c.name,
                etag: props.as_ref().and_then(|p| non_empty(p.etag.clone())),
                last_modified: props
                    .as_ref()
                    .and_then(|p| p.last_modified.as_deref())
                    .and_then(parse_http_date),
                public_access: props
                    .as_ref()
                    .and_then(|p| p.public_access.as_deref())
                    .and_then(|v| v.parse::<PublicAccessType>().ok()),
                metadata: c.metadata.unwrap_or_default(),
            }
        })
        .collect();
    Ok(Page {
        items,
        next_marker: non_empty(results.next_marker),
    })
}

/// Parse a List Blobs response page.
pub fn parse_blob_list(body: &str) -> Result<Page<BlobItem>> {
    let results: EnumerationResults = quick_xml::de::from_str(body).map_err(xml_error)?;
    let items = results
        .blobs
        .map(|b| b.items)
        .unwrap_or_default()
        .into_iter()
        .map(|b| {
            let props = b.properties;
            BlobItem {
                name: b.name,
                snapshot: non_empty(b.snapshot),
                deleted: b.deleted.unwrap_or(false),
                blob_type: props
                    .as_ref()
                    .and_then(|p| p.blob_type.as_deref())
                    .and_then(|v| v.parse::<BlobType>().ok()),
                size: props.as_ref().and_then(|p| p.content_length),
                content_type: props.as_ref().and_then(|p| non_empty(p.content_type.clone())),
                etag: props.as_ref().and_then(|p| non_empty(p.etag.clone())),
                last_modified: props
                    .as_ref()
                    .and_then(|p| p.last_modified.as_deref())
                    .and_then(parse_http_date),
                access_tier: props
                    .as_ref()
                    .and_then(|p| p.access_tier.as_deref())
                    .and_then(|v| v.parse::<AccessTier>().ok()),
                metadata: b.metadata.unwrap_or_default(),
            }
        })
        .collect();
    Ok(Page {
        items,
        next_marker: non_empty(results.next_marker),
    })
}

// ── Get Block List ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockListXml {
    #[serde(default)]
    committed_blocks: Option<BlocksXml>,
    #[serde(default)]
    uncommitted_blocks: Option<BlocksXml>,
}

#[derive(Debug, Deserialize)]
struct BlocksXml {
    #[serde(rename = "Block", default)]
    items: Vec<BlockXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockXml {
    name: String,
    size: u64,
}

/// Parse a Get Block List response.
pub fn parse_block_list(body: &str) -> Result<BlockList> {
    let parsed: BlockListXml = quick_xml::de::from_str(body).map_err(xml_error)?;
    let convert = |blocks: Option<BlocksXml>| -> Vec<Block> {
        blocks
            .map(|b| b.items)
            .unwrap_or_default()
            .into_iter()
            .map(|b| Block {
                name: b.name,
                size: b.size,
            })
            .collect()
    };
    Ok(BlockList {
        committed: convert(parsed.committed_blocks),
        uncommitted: convert(parsed.uncommitted_blocks),
    })
}

// ── Get Page Ranges ─────────────────────────────────────────────────

/// Parse a Get Page Ranges response.
///
/// The service reports inclusive `<End>` offsets; the returned ranges use
/// exclusive ends.
pub fn parse_page_list(body: &str) -> Result<PageList> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut list = PageList::default();
    let mut in_clear = false;
    let mut field: Option<&'static str> = None;
    let mut start: Option<u64> = None;
    let mut end: Option<u64> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"PageRange" => in_clear = false,
                b"ClearRange" => in_clear = true,
                b"Start" => field = Some("Start"),
                b"End" => field = Some("End"),
                _ => field = None,
            },
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                let value = text.trim().parse::<u64>().map_err(xml_error)?;
                match field {
                    Some("Start") => start = Some(value),
                    Some("End") => end = Some(value),
                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"PageRange" | b"ClearRange" => {
                    let (Some(s), Some(last)) = (start.take(), end.take()) else {
                        return Err(xml_error("page range without Start/End"));
                    };
                    let range = PageRange::new(s, last + 1);
                    if in_clear {
                        list.clear_ranges.push(range);
                    } else {
                        list.page_ranges.push(range);
                    }
                }
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(list)
}

// ── Error documents ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorXml {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract `(Code, Message)` from a service `<Error>` document.
pub fn parse_error(body: &str) -> Option<(Option<String>, Option<String>)> {
    let parsed: ErrorXml = quick_xml::de::from_str(body).ok()?;
    Some((non_empty(parsed.code), non_empty(parsed.message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_block_list() {
        let ids = vec!["QUFB".to_string(), "QkJC".to_string()];
        let xml = render_block_list(&ids).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<BlockList><Latest>QUFB</Latest><Latest>QkJC</Latest></BlockList>"));
    }

    #[test]
    fn test_render_block_list_escapes_ids() {
        let ids = vec!["a<b".to_string()];
        let xml = render_block_list(&ids).unwrap();
        assert!(xml.contains("<Latest>a&lt;b</Latest>"));
    }

    #[test]
    fn test_parse_container_list() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/">
  <Containers>
    <Container>
      <Name>alpha</Name>
      <Properties>
        <Last-Modified>Tue, 24 Feb 2026 12:34:56 GMT</Last-Modified>
        <Etag>"0x8D1"</Etag>
        <PublicAccess>blob</PublicAccess>
      </Properties>
    </Container>
    <Container>
      <Name>beta</Name>
      <Properties>
        <Etag>"0x8D2"</Etag>
      </Properties>
    </Container>
  </Containers>
  <NextMarker>beta-next</NextMarker>
</EnumerationResults>"#;
        let page = parse_container_list(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "alpha");
        assert_eq!(page.items[0].etag.as_deref(), Some("\"0x8D1\""));
        assert_eq!(page.items[0].public_access, Some(PublicAccessType::Blob));
        assert!(page.items[0].last_modified.is_some());
        assert_eq!(page.items[1].public_access, None);
        assert_eq!(page.next_marker.as_deref(), Some("beta-next"));
    }

    #[test]
    fn test_parse_blob_list() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="box">
  <Blobs>
    <Blob>
      <Name>logs/a.txt</Name>
      <Properties>
        <Content-Length>42</Content-Length>
        <Content-Type>text/plain</Content-Type>
        <BlobType>BlockBlob</BlobType>
        <AccessTier>Cool</AccessTier>
      </Properties>
      <Metadata>
        <owner>ops</owner>
      </Metadata>
    </Blob>
    <Blob>
      <Name>disk.vhd</Name>
      <Properties>
        <Content-Length>1024</Content-Length>
        <BlobType>PageBlob</BlobType>
      </Properties>
    </Blob>
  </Blobs>
</EnumerationResults>"#;
        let page = parse_blob_list(body).unwrap();
        assert_eq!(page.items.len(), 2);
        let first = &page.items[0];
        assert_eq!(first.name, "logs/a.txt");
        assert_eq!(first.size, Some(42));
        assert_eq!(first.blob_type, Some(BlobType::BlockBlob));
        assert_eq!(first.access_tier, Some(AccessTier::Cool));
        assert_eq!(first.metadata.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(page.items[1].blob_type, Some(BlobType::PageBlob));
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_parse_block_list() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<BlockList>
  <CommittedBlocks>
    <Block><Name>QUFB</Name><Size>4</Size></Block>
    <Block><Name>QkJC</Name><Size>8</Size></Block>
  </CommittedBlocks>
  <UncommittedBlocks>
    <Block><Name>Q0ND</Name><Size>2</Size></Block>
  </UncommittedBlocks>
</BlockList>"#;
        let list = parse_block_list(body).unwrap();
        assert_eq!(list.committed.len(), 2);
        assert_eq!(list.committed[1].name, "QkJC");
        assert_eq!(list.committed[1].size, 8);
        assert_eq!(list.uncommitted.len(), 1);
    }

    #[test]
    fn test_parse_page_list_interleaved() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<PageList>
  <PageRange><Start>0</Start><End>511</End></PageRange>
  <ClearRange><Start>512</Start><End>1023</End></ClearRange>
  <PageRange><Start>1024</Start><End>2047</End></PageRange>
</PageList>"#;
        let list = parse_page_list(body).unwrap();
        assert_eq!(
            list.page_ranges,
            vec![PageRange::new(0, 512), PageRange::new(1024, 2048)]
        );
        assert_eq!(list.clear_ranges, vec![PageRange::new(512, 1024)]);
    }

    #[test]
    fn test_parse_empty_page_list() {
        let list = parse_page_list("<PageList></PageList>").unwrap();
        assert!(list.page_ranges.is_empty());
        assert!(list.clear_ranges.is_empty());
    }

    #[test]
    fn test_parse_error_document() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<Error>
  <Code>ContainerAlreadyExists</Code>
  <Message>The specified container already exists.</Message>
</Error>"#;
        let (code, message) = parse_error(body).unwrap();
        assert_eq!(code.as_deref(), Some("ContainerAlreadyExists"));
        assert_eq!(
            message.as_deref(),
            Some("The specified container already exists.")
        );
    }
}
