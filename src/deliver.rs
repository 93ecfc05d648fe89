// src/deliver.rs
//! Delivery assembler: multipart/related message construction and SMTP
//! submission.
//!
//! The HTML part comes first, then one inline image part per item with a
//! local image, tagged with a content-id equal to the file's base name so the
//! `cid:` references in the HTML resolve. Bytes that do not sniff as an image
//! are skipped with a warning; feeds sometimes serve HTML error pages at
//! image URLs.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::enrich::EnrichedItem;

/// One inline attachment, ready for the multipart body.
#[derive(Debug, Clone)]
pub struct InlineImage {
    /// Matches a `cid:` reference in the HTML body.
    pub content_id: String,
    pub bytes: Vec<u8>,
    /// Full mime type, e.g. "image/jpeg".
    pub mime: String,
}

/// A fully assembled outgoing newsletter.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub subject: String,
    pub from: String,
    /// Recipient order is preserved for header rendering.
    pub to: Vec<String>,
    pub html_body: String,
    pub inline_images: Vec<InlineImage>,
}

/// Collect inline attachments from the enriched items.
///
/// Unreadable files and non-image content degrade to a skipped attachment;
/// the HTML side then simply has a dangling `cid:` the client renders as a
/// broken image, which matches the source behavior of not failing the run.
pub fn collect_inline_images(items: &[EnrichedItem]) -> Vec<InlineImage> {
    let mut out = Vec::new();
    for item in items {
        let Some(path) = &item.local_image else {
            continue;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "could not read image, skipping attachment");
                continue;
            }
        };
        match infer::get(&bytes) {
            Some(kind) if kind.mime_type().starts_with("image/") => out.push(InlineImage {
                content_id: name.to_string(),
                bytes,
                mime: kind.mime_type().to_string(),
            }),
            _ => {
                warn!(path = %path.display(), "skipped attachment: content is not an image");
            }
        }
    }
    out
}

/// Assemble the outgoing message from the rendered document.
pub fn assemble(
    subject: impl Into<String>,
    from: impl Into<String>,
    to: Vec<String>,
    html_body: impl Into<String>,
    items: &[EnrichedItem],
) -> OutgoingMessage {
    OutgoingMessage {
        subject: subject.into(),
        from: from.into(),
        to,
        html_body: html_body.into(),
        inline_images: collect_inline_images(items),
    }
}

/// Build the lettre message: multipart/related, HTML part first, inline
/// image parts after, each with its content-id.
pub fn build_message(msg: &OutgoingMessage) -> Result<Message> {
    let from: Mailbox = msg.from.parse().context("invalid sender address")?;

    let mut builder = Message::builder().from(from).subject(msg.subject.clone());
    for recipient in &msg.to {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("invalid recipient address {recipient}"))?;
        builder = builder.to(to);
    }

    let mut related = MultiPart::related().singlepart(
        SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(msg.html_body.clone()),
    );
    for img in &msg.inline_images {
        let content_type =
            ContentType::parse(&img.mime).context("invalid attachment mime type")?;
        related = related.singlepart(
            Attachment::new_inline(img.content_id.clone())
                .body(Body::new(img.bytes.clone()), content_type),
        );
    }

    builder
        .multipart(related)
        .context("building multipart message")
}

/// Authenticated STARTTLS submission client.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    /// Credentials come from the per-run configuration; a missing credential
    /// has already failed in `MailConfig::from_env`, before any attempt here.
    pub fn new(cfg: &MailConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.sender.clone(), cfg.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .context("invalid SMTP host")?
            .port(cfg.smtp_port)
            .credentials(creds)
            .build();
        Ok(Self { transport })
    }

    /// Submit to the full recipient set in one transaction. Errors are logged
    /// and re-raised; the run is then failed, with no retry.
    pub async fn send(&self, msg: &OutgoingMessage) -> Result<()> {
        let email = build_message(msg)?;
        match self.transport.send(email).await {
            Ok(_) => {
                metrics::counter!("newsletter_sent_total").increment(1);
                info!(recipients = ?msg.to, subject = %msg.subject, "newsletter sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = ?e, recipients = ?msg.to, "newsletter submission failed");
                Err(e).context("smtp submission")
            }
        }
    }
}
