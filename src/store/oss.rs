//! Aliyun OSS store over the REST API.
//!
//! Requests are signed with the OSS header signature (V1):
//! `Authorization: OSS <id>:<base64(hmac-sha1(secret, string_to_sign))>`.

use crate::config::Credentials;
use crate::error::StoreError;
use crate::store::provider::{ListPage, RemoteStore, MAX_PAGE_SIZE};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use serde::Deserialize;
use sha1::Sha1;
use std::fs::File;
use std::path::Path;
use tracing::debug;

const CONTENT_MD5: &str = "Content-MD5";

/// Aliyun OSS bucket client.
pub struct OssStore {
    client: Client,
    scheme: String,
    host: String,
    bucket: String,
    access_key_id: String,
    access_key_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
    #[serde(default)]
    contents: Vec<ObjectSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectSummary {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OssStore {
    /// Create a client for the bucket described by `credentials`.
    pub fn new(credentials: &Credentials) -> Result<Self, StoreError> {
        let endpoint = credentials.endpoint();
        let (scheme, host) = match endpoint.split_once("://") {
            Some((scheme, host)) => (scheme.to_string(), host.to_string()),
            None => ("https".to_string(), endpoint.clone()),
        };

        Ok(Self {
            client: Client::builder().build()?,
            scheme,
            host: host.trim_end_matches('/').to_string(),
            bucket: credentials.bucket.clone(),
            access_key_id: credentials.access_key_id.clone(),
            access_key_secret: credentials.access_key_secret.clone(),
        })
    }

    fn bucket_url(&self) -> String {
        format!("{}://{}.{}", self.scheme, self.bucket, self.host)
    }

    fn object_url(&self, name: &str) -> String {
        let encoded = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.bucket_url(), encoded)
    }

    /// Compute the `Authorization` header value for one request.
    fn authorization(
        &self,
        verb: &str,
        content_md5: &str,
        content_type: &str,
        date: &str,
        resource: &str,
    ) -> Result<String, StoreError> {
        let to_sign = string_to_sign(verb, content_md5, content_type, date, resource);
        let signature = sign(&self.access_key_secret, &to_sign)?;
        Ok(format!("OSS {}:{}", self.access_key_id, signature))
    }

    fn send(
        &self,
        request: RequestBuilder,
        verb: &str,
        content_md5: &str,
        content_type: &str,
        resource: &str,
    ) -> Result<Response, StoreError> {
        let date = http_date();
        let authorization =
            self.authorization(verb, content_md5, content_type, &date, resource)?;

        let mut request = request
            .header(DATE, &date)
            .header(AUTHORIZATION, authorization);
        if !content_type.is_empty() {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if !content_md5.is_empty() {
            request = request.header(CONTENT_MD5, content_md5);
        }

        let response = request.send()?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(http_error(response))
        }
    }

    fn delete_batch(&self, names: &[&str]) -> Result<(), StoreError> {
        let body = delete_body(names);
        let content_md5 = BASE64.encode(Md5::digest(body.as_bytes()));
        let content_type = "application/xml";
        let resource = format!("/{}/?delete", self.bucket);

        let request = self
            .client
            .post(format!("{}/?delete", self.bucket_url()))
            .body(body);
        self.send(request, "POST", &content_md5, content_type, &resource)?;
        Ok(())
    }
}

impl RemoteStore for OssStore {
    fn name(&self) -> &'static str {
        "oss"
    }

    fn put(&self, key: &str, local_path: &Path) -> Result<(), StoreError> {
        let name = object_name(key)?;
        let content_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let resource = format!("/{}/{}", self.bucket, name);

        debug!("[OSS] PUT {} ({})", name, content_type);
        let body = Body::from(File::open(local_path)?);
        let request = self.client.put(self.object_url(name)).body(body);
        self.send(request, "PUT", "", &content_type, &resource)?;
        Ok(())
    }

    fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        marker: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        // OSS object names never start with '/'; answer in the caller's form
        let leading = if prefix.starts_with('/') { "/" } else { "" };
        let max_keys = max_keys.clamp(1, MAX_PAGE_SIZE).to_string();

        let mut query = vec![
            ("prefix", prefix.trim_start_matches('/')),
            ("max-keys", max_keys.as_str()),
        ];
        if let Some(marker) = marker {
            query.push(("marker", marker.trim_start_matches('/')));
        }

        debug!("[OSS] LIST {:?}", query);
        let request = self
            .client
            .get(format!("{}/", self.bucket_url()))
            .query(&query);
        let resource = format!("/{}/", self.bucket);
        let text = self.send(request, "GET", "", "", &resource)?.text()?;

        parse_list_page(&text, leading)
    }

    fn delete_multiple(&self, keys: &[String]) -> Result<(), StoreError> {
        let names = keys
            .iter()
            .map(|key| object_name(key))
            .collect::<Result<Vec<_>, _>>()?;

        for batch in names.chunks(MAX_PAGE_SIZE) {
            debug!("[OSS] DELETE {} objects", batch.len());
            self.delete_batch(batch)?;
        }
        Ok(())
    }
}

/// OSS object name for a key: no leading '/'.
fn object_name(key: &str) -> Result<&str, StoreError> {
    let name = key.trim_start_matches('/');
    if name.is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(name)
}

fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    resource: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        verb, content_md5, content_type, date, resource
    )
}

fn sign(secret: &str, to_sign: &str) -> Result<String, StoreError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| StoreError::Other(format!("Invalid access key secret: {}", e)))?;
    mac.update(to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn http_error(response: Response) -> StoreError {
    let status = response.status();
    let text = response.text().unwrap_or_default();

    match quick_xml::de::from_str::<ErrorBody>(&text) {
        Ok(body) if !body.code.is_empty() => StoreError::Http {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        },
        _ => StoreError::Http {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: text,
        },
    }
}

fn parse_list_page(xml: &str, leading: &str) -> Result<ListPage, StoreError> {
    let result: ListBucketResult = quick_xml::de::from_str(xml)?;

    let keys: Vec<String> = result
        .contents
        .into_iter()
        .map(|object| format!("{}{}", leading, object.key))
        .collect();

    let next_marker = if result.is_truncated {
        result
            .next_marker
            .filter(|marker| !marker.is_empty())
            .map(|marker| format!("{}{}", leading, marker))
            .or_else(|| keys.last().cloned())
    } else {
        None
    };

    Ok(ListPage { keys, next_marker })
}

fn delete_body(names: &[&str]) -> String {
    let mut body = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Delete><Quiet>true</Quiet>"#);
    for name in names {
        body.push_str("<Object><Key>");
        body.push_str(&quick_xml::escape::escape(*name));
        body.push_str("</Key></Object>");
    }
    body.push_str("</Delete>");
    body
}
