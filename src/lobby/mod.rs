mod error;

use crate::{bank::Question, command};
use error::Result;
use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use rand::thread_rng;
use tokio::{sync::oneshot, time};

use twilight_model::{
    application::interaction::{Interaction, InteractionData},
    channel::{
        message::{
            component::{ActionRow, Button, ButtonStyle},
            Component,
        },
        Message,
    },
    http::interaction::{InteractionResponse, InteractionResponseType},
    id::{
        marker::{ChannelMarker, MessageMarker, UserMarker},
        Id,
    },
};

/// The one recognized text command.
pub const TRIGGER: &str = "!quiz";

/// How long a posted question waits for a selection.
const RESPONSE_WINDOW: Duration = Duration::from_secs(20);
/// How long the final tally stays up before the run's messages are deleted.
const CLEANUP_DELAY: Duration = Duration::from_secs(3);
/// Button labels beyond this many characters are cut off.
const MAX_LABEL: usize = 80;

type Key = Id<MessageMarker>;
type Channel = oneshot::Sender<String>;
type Registry = DashMap<Key, Channel>;

/// Races the registered response channel against the timeout window. The
/// registry entry is removed before returning, whichever side wins, so no
/// listener outlives its question.
async fn await_choice(pending: &Registry, key: Key, rx: oneshot::Receiver<String>) -> Option<String> {
    let choice = tokio::select! {
        biased;
        res = rx => res.ok(),
        () = time::sleep(RESPONSE_WINDOW) => None,
    };
    pending.remove(&key);
    choice
}

/// Delivers a selection to the question waiting on `key`. Returns `false`
/// when nobody is waiting anymore, i.e. the window has already closed.
fn resolve(pending: &Registry, key: Key, choice: String) -> bool {
    match pending.remove(&key) {
        Some((_, tx)) => tx.send(choice).is_ok(),
        None => false,
    }
}

/// Whether the first whitespace-delimited token is the trigger command.
/// Longer tokens sharing the prefix, e.g. `!quizzes`, do not count.
fn is_trigger(content: &str) -> bool {
    content
        .strip_prefix(TRIGGER)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Deletion order for a finished run: the tracked trail first, then the
/// summary, each ID exactly once.
fn sweep(trail: Vec<Key>, summary: Option<Key>) -> Vec<Key> {
    let mut ids = trail;
    ids.extend(summary);
    ids
}

fn truncate(label: &str) -> &str {
    match label.char_indices().nth(MAX_LABEL) {
        Some((index, _)) => &label[..index],
        None => label,
    }
}

struct Inner {
    /// Discord REST client shared by every run.
    api: twilight_http::Client,
    /// Container for all questions awaiting a selection.
    pending: Registry,
    /// The question bank, immutable after load.
    bank: Box<[Question]>,
    /// Our own user, so we never answer ourselves.
    user: Id<UserMarker>,
}

#[derive(Clone)]
pub struct Lobby {
    inner: Arc<Inner>,
}

impl Lobby {
    pub fn new(api: twilight_http::Client, user: Id<UserMarker>, bank: Vec<Question>) -> Self {
        Self {
            inner: Arc::new(Inner { api, pending: Registry::new(), bank: bank.into_boxed_slice(), user }),
        }
    }

    /// Responds to new gateway messages. Anything that is not a trigger
    /// command from someone else is ignored.
    pub async fn on_message(&self, message: Message) {
        if message.author.id == self.inner.user || !is_trigger(&message.content) {
            return;
        }

        let request = match command::parse(&message.content) {
            Ok(request) => request,
            Err(err) => {
                self.post(message.channel_id, &err.to_string()).await;
                return;
            }
        };

        let selection = command::select(&self.inner.bank, &request, &mut thread_rng());
        if let Err(err) = self.inner.api.delete_message(message.channel_id, message.id).await {
            log::warn!("failed to delete the trigger message: {err}");
        }

        self.run(message.channel_id, selection).await;
    }

    /// Responds to message component interactions by acknowledging the click
    /// and forwarding the chosen key to whichever question is waiting on the
    /// clicked message.
    pub async fn on_component(&self, interaction: Interaction) {
        let Some(InteractionData::MessageComponent(data)) = interaction.data else {
            return;
        };
        let Some(message) = interaction.message else {
            return;
        };

        let ack = InteractionResponse { kind: InteractionResponseType::DeferredUpdateMessage, data: None };
        let client = self.inner.api.interaction(interaction.application_id);
        if let Err(err) = client.create_response(interaction.id, &interaction.token, &ack).await {
            // Abandon the selection; the question resolves by timeout.
            log::error!("failed to acknowledge the interaction: {err}");
            return;
        }

        if !resolve(&self.inner.pending, message.id, data.custom_id) {
            log::debug!("dropped a stale selection for message {}", message.id);
        }
    }

    /// Presents the selection question by question, posts the tally, then
    /// deletes every message the run produced after a short delay.
    async fn run(&self, channel: Id<ChannelMarker>, questions: Vec<Question>) {
        let total = questions.len();
        let mut correct = 0;
        let mut trail = Vec::new();

        for question in &questions {
            if self.present(channel, question, &mut trail).await {
                correct += 1;
            }
        }

        let summary = self.post(channel, &format!("Quiz complete! You got {correct}/{total} correct.")).await;

        time::sleep(CLEANUP_DELAY).await;
        for id in sweep(trail, summary) {
            if let Err(err) = self.inner.api.delete_message(channel, id).await {
                log::warn!("failed to delete message {id}: {err}");
            }
        }
    }

    /// Posts one question and waits for the first selection on it, or for the
    /// response window to close. Returns whether the selection was correct.
    async fn present(&self, channel: Id<ChannelMarker>, question: &Question, trail: &mut Vec<Key>) -> bool {
        let prompt = match self.send_prompt(channel, question).await {
            Ok(id) => id,
            Err(err) => {
                log::error!("failed to send a question: {err}");
                return false;
            }
        };
        trail.push(prompt);

        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(prompt, tx);
        let choice = await_choice(&self.inner.pending, prompt, rx).await;

        let (verdict, feedback) = match choice {
            Some(key) if key == question.answer => (true, String::from("Correct!")),
            Some(_) => (false, format!("Wrong! The correct answer was: {}", question.correct_text())),
            None => (false, String::from("Time's up! Moving to the next question.")),
        };
        if let Some(id) = self.post(channel, &feedback).await {
            trail.push(id);
        }
        verdict
    }

    async fn send_prompt(&self, channel: Id<ChannelMarker>, question: &Question) -> Result<Key> {
        let buttons = question
            .choices
            .iter()
            .map(|(key, label)| {
                Component::Button(Button {
                    custom_id: Some(key.clone()),
                    disabled: false,
                    emoji: None,
                    label: Some(truncate(label).to_owned()),
                    style: ButtonStyle::Primary,
                    url: None,
                })
            })
            .collect();
        let row = [Component::ActionRow(ActionRow { components: buttons })];

        let message = self
            .inner
            .api
            .create_message(channel)
            .content(&question.question)?
            .components(&row)?
            .await?
            .model()
            .await?;
        Ok(message.id)
    }

    /// Sends a plain text message, logging instead of propagating failures.
    /// Returns the new message's ID so the caller may track it for cleanup.
    async fn post(&self, channel: Id<ChannelMarker>, content: &str) -> Option<Key> {
        match self.try_post(channel, content).await {
            Ok(id) => Some(id),
            Err(err) => {
                log::error!("failed to send a message: {err}");
                None
            }
        }
    }

    async fn try_post(&self, channel: Id<ChannelMarker>, content: &str) -> Result<Key> {
        let message = self.inner.api.create_message(channel).content(content)?.await?.model().await?;
        Ok(message.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn recognizes_only_the_exact_trigger_token() {
        assert!(is_trigger("!quiz 5"));
        assert!(is_trigger("!quiz random 5"));
        assert!(is_trigger("!quiz"));
        assert!(!is_trigger("!quizzes 3"));
        assert!(!is_trigger("quiz 5"));
        assert!(!is_trigger("hello there"));
    }

    #[test]
    fn sweeps_every_tracked_message_once_with_the_summary_last() {
        let trail = vec![Id::new(1), Id::new(2), Id::new(3)];
        let ids = sweep(trail, Some(Id::new(4)));
        assert_eq!(ids, [Id::new(1), Id::new(2), Id::new(3), Id::new(4)]);
        let distinct: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), ids.len());
    }

    #[test]
    fn sweeps_only_the_trail_when_the_summary_was_never_posted() {
        let ids = sweep(vec![Id::new(5), Id::new(6)], None);
        assert_eq!(ids, [Id::new(5), Id::new(6)]);
    }

    #[test]
    fn truncates_long_labels_on_char_boundaries() {
        assert_eq!(truncate("True"), "True");
        let long = "x".repeat(100);
        assert_eq!(truncate(&long).len(), MAX_LABEL);
        let wide = "é".repeat(100);
        assert_eq!(truncate(&wide).chars().count(), MAX_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn selection_inside_the_window_wins_once() {
        let pending = Registry::new();
        let key = Id::new(1);
        let (tx, rx) = oneshot::channel();
        pending.insert(key, tx);

        assert!(resolve(&pending, key, String::from("a")));
        // The sender is gone, so a second click cannot be delivered.
        assert!(!resolve(&pending, key, String::from("b")));

        let choice = await_choice(&pending, key, rx).await;
        assert_eq!(choice.as_deref(), Some("a"));
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_unregisters_the_listener() {
        let pending = Arc::new(Registry::new());
        let key = Id::new(2);
        let (tx, rx) = oneshot::channel();
        pending.insert(key, tx);

        let waiter = tokio::spawn({
            let pending = Arc::clone(&pending);
            async move { await_choice(&pending, key, rx).await }
        });

        tokio::task::yield_now().await;
        time::advance(RESPONSE_WINDOW + Duration::from_millis(1)).await;
        assert_eq!(waiter.await.unwrap(), None);

        // A selection arriving after the window closed is dropped, so it can
        // never alter the already-recorded score.
        assert!(!resolve(&pending, key, String::from("a")));
        assert!(pending.is_empty());
    }
}
