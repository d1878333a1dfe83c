//! Parsing for `MANSCDP+xml` bodies, the GB28181 command vocabulary
//! layered on top of SIP MESSAGE: an explicit parse into a tagged union
//! rather than ad-hoc struct-tag decoding.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct KeepaliveBody {
    #[serde(rename = "SN")]
    pub sn: Option<u32>,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDeviceList {
    #[serde(rename = "Item", default)]
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogBody {
    #[serde(rename = "SN")]
    pub sn: Option<u32>,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "DeviceList")]
    pub device_list: CatalogDeviceList,
}

/// The GB28181 command bodies this server acts on, plus a catch-all for
/// everything else (`MediaStatus`, `Alarm`, vendor extensions) which is
/// simply forwarded to the configured webhook.
#[derive(Debug, Clone)]
pub enum ManscdpMessage {
    Keepalive(KeepaliveBody),
    Catalog(CatalogBody),
    Unknown { cmd_type: String, raw: String },
}

/// Peeks `<CmdType>` and dispatches to the matching struct.
pub fn parse(body: &str) -> Result<ManscdpMessage> {
    let cmd_type = extract_cmd_type(body).ok_or_else(|| Error::Xml("missing <CmdType>".to_string()))?;
    match cmd_type.as_str() {
        "Keepalive" => {
            let parsed: KeepaliveBody = quick_xml::de::from_str(body).map_err(|e| Error::Xml(e.to_string()))?;
            Ok(ManscdpMessage::Keepalive(parsed))
        }
        "Catalog" => {
            let parsed: CatalogBody = quick_xml::de::from_str(body).map_err(|e| Error::Xml(e.to_string()))?;
            Ok(ManscdpMessage::Catalog(parsed))
        }
        other => Ok(ManscdpMessage::Unknown {
            cmd_type: other.to_string(),
            raw: body.to_string(),
        }),
    }
}

fn extract_cmd_type(body: &str) -> Option<String> {
    let start = body.find("<CmdType>")? + "<CmdType>".len();
    let end = body[start..].find("</CmdType>")? + start;
    Some(body[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keepalive_ok() {
        let body = "<Notify><CmdType>Keepalive</CmdType><SN>1</SN><DeviceID>34020000001320000001</DeviceID><Status>OK</Status></Notify>";
        match parse(body).unwrap() {
            ManscdpMessage::Keepalive(k) => {
                assert_eq!(k.device_id, "34020000001320000001");
                assert_eq!(k.status, "OK");
            }
            other => panic!("expected Keepalive, got {:?}", other),
        }
    }

    #[test]
    fn parses_catalog_with_two_items() {
        let body = r#"<Response>
            <CmdType>Catalog</CmdType>
            <SN>2</SN>
            <DeviceID>34020000001320000001</DeviceID>
            <DeviceList Num="2">
                <Item><DeviceID>34020000001320000002</DeviceID><Name>Cam 1</Name></Item>
                <Item><DeviceID>34020000001320000003</DeviceID><Name>Cam 2</Name></Item>
            </DeviceList>
        </Response>"#;
        match parse(body).unwrap() {
            ManscdpMessage::Catalog(c) => assert_eq!(c.device_list.items.len(), 2),
            other => panic!("expected Catalog, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_cmd_type_becomes_unknown() {
        let body = "<Notify><CmdType>Alarm</CmdType><DeviceID>x</DeviceID></Notify>";
        match parse(body).unwrap() {
            ManscdpMessage::Unknown { cmd_type, .. } => assert_eq!(cmd_type, "Alarm"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn missing_cmd_type_is_an_error() {
        assert!(parse("<Notify><DeviceID>x</DeviceID></Notify>").is_err());
    }
}
