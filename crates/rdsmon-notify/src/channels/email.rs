use crate::email_report::EmailPayload;
use crate::error::{NotifyError, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP delivery for the rendered report.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.parse()?,
        })
    }

    /// Send one report to the given recipient lists. At least one
    /// primary recipient is required; cc and bcc may be empty.
    pub async fn send(
        &self,
        payload: &EmailPayload,
        to: &[String],
        cc: &[String],
        bcc: &[String],
    ) -> Result<()> {
        if to.is_empty() {
            return Err(NotifyError::Misconfigured(
                "no primary mail recipients configured".to_string(),
            ));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&payload.subject);
        for addr in to {
            builder = builder.to(addr.parse()?);
        }
        for addr in cc {
            builder = builder.cc(addr.parse()?);
        }
        for addr in bcc {
            builder = builder.bcc(addr.parse()?);
        }

        let message = builder.multipart(MultiPart::alternative_plain_html(
            payload.text.clone(),
            payload.html.clone(),
        ))?;

        self.transport.send(message).await?;
        tracing::debug!(
            recipients = to.len() + cc.len() + bcc.len(),
            "report mail delivered"
        );
        Ok(())
    }
}
