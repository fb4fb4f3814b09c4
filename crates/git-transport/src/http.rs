//! HTTP/HTTPS smart transport implementation.
//!
//! Implements the git smart HTTP protocol for fetch and push.
//! Each request/response cycle is a separate HTTP request: a GET against
//! `info/refs` to discover refs, then a POST against the service endpoint
//! carrying the negotiation body and receiving the pack in response.

use std::io::{Cursor, Read, Write};

use crate::{GitUrl, Service, Transport, TransportError};

/// HTTP transport state.
pub struct HttpTransport {
    /// Base URL for the repository.
    base_url: String,
    /// The service we're talking to.
    service: Service,
    /// Buffer for data to be sent in the next request.
    write_buf: Vec<u8>,
    /// Response data from the last request.
    read_buf: Cursor<Vec<u8>>,
    /// Whether the initial info/refs request has been made.
    initial_request_done: bool,
    /// Whether write_buf holds data not yet posted.
    dirty: bool,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Perform the initial GET to /info/refs?service=... and return the response.
    fn do_initial_request(&mut self) -> Result<(), TransportError> {
        if self.initial_request_done {
            return Ok(());
        }

        let url = format!(
            "{}/info/refs?service={}",
            self.base_url,
            self.service.as_str()
        );

        let response = http_get(&self.client, &url)?;
        self.read_buf = Cursor::new(response);
        self.initial_request_done = true;
        Ok(())
    }

    /// Perform a POST to the service endpoint with the write buffer contents.
    fn do_post(&mut self) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.base_url, self.service.as_str());
        let content_type = format!("application/x-{}-request", self.service.as_str());
        let accept = format!("application/x-{}-result", self.service.as_str());

        let body = std::mem::take(&mut self.write_buf);
        let response = http_post(&self.client, &url, &content_type, &accept, &body)?;
        self.read_buf = Cursor::new(response);
        self.dirty = false;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn reader(&mut self) -> &mut dyn Read {
        if !self.initial_request_done {
            if let Err(e) = self.do_initial_request() {
                eprintln!("HTTP initial request error: {}", e);
            }
        } else if self.dirty {
            if let Err(e) = self.do_post() {
                eprintln!("HTTP POST error: {}", e);
            }
        }
        &mut self.read_buf
    }

    fn writer(&mut self) -> &mut dyn Write {
        self.dirty = true;
        &mut self.write_buf
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_stateless(&self) -> bool {
        true
    }
}

/// Connect to a remote repository over HTTP/HTTPS.
pub fn connect(url: &GitUrl, service: Service) -> Result<Box<dyn Transport>, TransportError> {
    let base_url = format!(
        "{}://{}{}{}",
        url.scheme,
        url.host.as_deref().unwrap_or(""),
        url.port.map(|p| format!(":{}", p)).unwrap_or_default(),
        url.path
    );

    let client = reqwest::blocking::Client::builder()
        .build()
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

    let mut transport = HttpTransport {
        base_url,
        service,
        write_buf: Vec::new(),
        read_buf: Cursor::new(Vec::new()),
        initial_request_done: false,
        dirty: false,
        client,
    };

    transport.do_initial_request()?;

    Ok(Box::new(transport))
}

/// Blocking HTTP GET against the info/refs endpoint.
fn http_get(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, TransportError> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            message: format!("GET {} failed", url),
        });
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))
}

/// Blocking HTTP POST carrying the negotiation body, returning the raw response body.
fn http_post(
    client: &reqwest::blocking::Client,
    url: &str,
    content_type: &str,
    accept: &str,
    body: &[u8],
) -> Result<Vec<u8>, TransportError> {
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, content_type)
        .header(reqwest::header::ACCEPT, accept)
        .body(body.to_vec())
        .send()
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            message: format!("POST {} failed", url),
        });
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))
}
