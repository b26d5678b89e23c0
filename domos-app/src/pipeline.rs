//! Pipeline driver: one sequential pass over the unread mailbox.

use crate::store::ActionItemStore;
use anyhow::Context;
use domos_llm::CompletionProvider;
use domos_mail::{InboundEmail, MailTransport, MailboxSession, MailboxSource, ReplySender};
use domos_triage::{
    ActionItemExtractor, Extraction, GeneratedReply, GenerationSettings, ReplyGenerator,
    TenantDirectory, TenantRecord,
};
use serde::Serialize;
use std::sync::Arc;

/// Reply plus action item for one email, before anything is persisted or sent.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub tenant: TenantRecord,
    pub reply: GeneratedReply,
    pub extraction: Extraction,
}

/// Tenant lookup, reply drafting and action item extraction. No side effects.
#[derive(Clone)]
pub struct Triager {
    directory: Arc<dyn TenantDirectory>,
    replies: ReplyGenerator,
    extractor: ActionItemExtractor,
}

impl Triager {
    pub fn new(provider: Arc<dyn CompletionProvider>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            directory,
            replies: ReplyGenerator::new(provider.clone()),
            extractor: ActionItemExtractor::new(provider),
        }
    }

    pub fn with_settings(mut self, reply: GenerationSettings, classify: GenerationSettings) -> Self {
        self.replies = self.replies.with_settings(reply);
        self.extractor = self.extractor.with_settings(classify);
        self
    }

    pub async fn assess(&self, sender_address: &str, subject: &str, body: &str) -> Assessment {
        let tenant = self.directory.lookup(sender_address);
        if tenant.is_unknown() {
            tracing::info!(sender = %sender_address, "sender is not a known tenant");
        }
        let reply = self.replies.generate(body, &tenant).await;
        let extraction = self
            .extractor
            .extract(body, subject, sender_address, &tenant.unit)
            .await;
        Assessment {
            tenant,
            reply,
            extraction,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub limit: Option<usize>,
    /// Triage only: nothing is persisted, sent or marked.
    pub dry_run: bool,
    pub mark_processed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub persisted: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
}

pub struct Pipeline<M, T> {
    mailbox: M,
    sender: ReplySender<T>,
    triager: Triager,
    store: ActionItemStore,
}

impl<M: MailboxSource, T: MailTransport> Pipeline<M, T> {
    pub fn new(
        mailbox: M,
        sender: ReplySender<T>,
        triager: Triager,
        store: ActionItemStore,
    ) -> Self {
        Self {
            mailbox,
            sender,
            triager,
            store,
        }
    }

    /// Only mailbox connect and listing abort the run; every per-email failure is logged.
    #[tracing::instrument(level = "info", skip_all, fields(dry_run = options.dry_run))]
    pub async fn run(&self, options: RunOptions) -> anyhow::Result<RunSummary> {
        let session = self
            .mailbox
            .connect()
            .await
            .context("connect to mailbox")?;
        tracing::info!(mailbox = %session.email_address, "mailbox connected");

        let emails = self
            .mailbox
            .list_unread(&session, options.limit)
            .await
            .context("list unread messages")?;
        tracing::info!(count = emails.len(), "unread messages fetched");

        let mut summary = RunSummary::default();
        for email in &emails {
            self.process(&session, email, options, &mut summary).await;
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            persisted = summary.persisted,
            delivered = summary.delivered,
            delivery_failures = summary.delivery_failures,
            "run complete"
        );
        Ok(summary)
    }

    #[tracing::instrument(level = "info", skip_all, fields(message_id = %email.id))]
    async fn process(
        &self,
        session: &MailboxSession,
        email: &InboundEmail,
        options: RunOptions,
        summary: &mut RunSummary,
    ) {
        if email.sender_address.trim().is_empty() {
            tracing::warn!(from = %email.from, "message has no sender address; skipping");
            summary.skipped += 1;
            return;
        }

        let assessment = self
            .triager
            .assess(&email.sender_address, &email.subject, &email.body)
            .await;
        let item = &assessment.extraction.item;
        summary.processed += 1;
        tracing::info!(
            reply_source = assessment.reply.source.as_str(),
            classification_source = assessment.extraction.source.as_str(),
            action_type = item.action_type.map(|t| t.as_str()).unwrap_or("none"),
            cc = item.cc(),
            "message triaged"
        );

        if options.dry_run {
            tracing::info!(reply = %assessment.reply.text, "dry run; not persisting or sending");
            return;
        }

        if item.is_actionable() {
            match self.store.append(item).await {
                Ok(count) => {
                    summary.persisted += 1;
                    tracing::info!(path = %self.store.path().display(), records = count, "action item recorded");
                }
                Err(e) => tracing::error!(error = %e, "failed to record action item"),
            }
        } else {
            tracing::info!("no workflow action detected");
        }

        let report = self
            .sender
            .send(&email.sender_address, &email.subject, &assessment.reply.text, item.cc())
            .await;
        if report.is_delivered() {
            summary.delivered += 1;
        } else {
            summary.delivery_failures += 1;
        }

        if options.mark_processed {
            if let Err(e) = self.mailbox.mark_processed(session, &email.id).await {
                tracing::warn!(error = %e, "failed to mark message processed");
            }
        }
    }
}
