//! Interaction routing.
//!
//! Buttons, slash commands and context-menu commands are mapped onto the
//! generic model and dispatched like any other event:
//!
//! | Interaction         | Event kind             | Key path                          |
//! |---------------------|------------------------|-----------------------------------|
//! | Button              | `button`               | `[custom id]`                     |
//! | Slash command       | `slash_command`        | `[command id, group, subcommand]` |
//! | Message menu        | `message_context_menu` | `[command id]`                    |
//! | User menu           | `user_context_menu`    | `[command id]`                    |
//!
//! Autocomplete requests are answered directly instead. The slash-command
//! descriptor is resolved with its own registry lookup, the focused option's
//! callback is invoked, and the platform always receives an answer: any miss
//! or failure yields an empty suggestion list.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use herald_core::{
    BoxedEvent, Choice, CommandInvocation, Event, EventKind, FocusedOption, HandlerError,
    Interaction, InteractionEvent,
};
use tracing::{debug, error, warn};

use crate::dispatcher::{DispatchReport, Dispatcher};

/// What routing an interaction did.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// The interaction was dispatched to handlers.
    Dispatched(DispatchReport),
    /// An autocomplete request was answered with these suggestions.
    Autocompleted(Vec<Choice>),
}

impl Dispatcher {
    /// Routes a platform interaction.
    pub async fn route_interaction<E: InteractionEvent>(&self, event: Arc<E>) -> RouteOutcome {
        let interaction = event.interaction();
        let scope = event.scope();
        let boxed = BoxedEvent::from_arc(event as Arc<dyn Event>);

        match &interaction {
            Interaction::Autocomplete {
                invocation,
                focused,
            } => {
                let choices = self.autocomplete(&boxed, invocation, focused).await;
                RouteOutcome::Autocompleted(choices)
            }
            _ => {
                let Some(kind) = interaction.kind() else {
                    return RouteOutcome::Dispatched(DispatchReport::default());
                };
                let occurrence = interaction.occurrence(scope);
                let path = occurrence.key_path.clone();
                let report = self
                    .dispatch_occurrences(kind, boxed, vec![occurrence])
                    .await;
                if report.candidates == 0 {
                    warn!(kind = %kind, path = %path, "No handler registered for interaction");
                }
                RouteOutcome::Dispatched(report)
            }
        }
    }

    /// Answers an autocomplete request; the platform always gets a response.
    async fn autocomplete(
        &self,
        event: &BoxedEvent,
        invocation: &CommandInvocation,
        focused: &FocusedOption,
    ) -> Vec<Choice> {
        let mut choices = self
            .complete(event, invocation, focused)
            .await
            .unwrap_or_default();
        choices.truncate(self.settings().autocomplete_limit);

        if let Err(err) = self.bot().respond_autocomplete(event, choices.clone()).await {
            warn!(error = %err, "Failed to answer autocomplete request");
        }
        choices
    }

    async fn complete(
        &self,
        event: &BoxedEvent,
        invocation: &CommandInvocation,
        focused: &FocusedOption,
    ) -> Option<Vec<Choice>> {
        let path = invocation.key_path();
        let descriptor = self
            .registry()
            .lookup(EventKind::SlashCommand, &path)
            .into_iter()
            .next();
        let Some(descriptor) = descriptor else {
            warn!(path = %path, "No command registered for autocomplete request");
            return None;
        };

        let callback = descriptor
            .command()
            .and_then(|spec| spec.find_option(&focused.name))
            .and_then(|option| option.autocomplete.clone());
        let Some(callback) = callback else {
            warn!(
                handler = descriptor.name(),
                option = %focused.name,
                "Option does not support autocomplete"
            );
            return None;
        };

        let result = AssertUnwindSafe(callback.complete(&focused.value, event))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerError::panicked(payload)));

        match result {
            Ok(choices) => {
                debug!(option = %focused.name, choices = choices.len(), "Autocomplete answered");
                Some(choices)
            }
            Err(err) => {
                error!(
                    handler = descriptor.name(),
                    option = %focused.name,
                    error = %err,
                    "Autocomplete callback failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use herald_core::Scope;

    use crate::command::{CommandOption, CommandSpec, autocomplete_fn};
    use crate::dispatcher::DispatchSettings;
    use crate::registration::HandlerOptions;
    use crate::registry::Registry;
    use crate::testing::{RecordingBot, TestInteraction, counting_handler};

    fn autocomplete_request(option: &str, value: &str) -> Arc<TestInteraction> {
        TestInteraction::new(
            Interaction::Autocomplete {
                invocation: CommandInvocation::new("poll"),
                focused: FocusedOption {
                    name: option.to_string(),
                    value: value.to_string(),
                },
            },
            None,
        )
    }

    fn poll_registry(option: CommandOption) -> Registry {
        let mut registry = Registry::new();
        let (handler, _) = counting_handler();
        registry
            .register_instance(
                HandlerOptions::slash(CommandSpec::new("poll", "Polls").option(option)),
                handler,
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_button_routes_by_custom_id() {
        let mut registry = Registry::new();
        let (handler, calls) = counting_handler();
        registry
            .register_instance(HandlerOptions::button("confirm"), handler)
            .unwrap();

        let dispatcher = Dispatcher::new(registry, RecordingBot::new());
        let event = TestInteraction::new(
            Interaction::Button {
                custom_id: "confirm".into(),
            },
            Some(Scope::server()),
        );
        let outcome = dispatcher.route_interaction(event).await;

        assert!(matches!(outcome, RouteOutcome::Dispatched(ref r) if r.executed == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slash_command_routes_by_subcommand() {
        let mut registry = Registry::new();
        let (ping, ping_calls) = counting_handler();
        let (pong, pong_calls) = counting_handler();
        registry
            .register_instance(
                HandlerOptions::slash(CommandSpec::new("util", "Utilities").subcommand("ping")),
                ping,
            )
            .unwrap();
        registry
            .register_instance(
                HandlerOptions::slash(CommandSpec::new("util", "Utilities").subcommand("pong")),
                pong,
            )
            .unwrap();

        let dispatcher = Dispatcher::new(registry, RecordingBot::new());
        let event = TestInteraction::new(
            Interaction::SlashCommand(CommandInvocation::new("util").subcommand("pong")),
            Some(Scope::server()),
        );
        dispatcher.route_interaction(event).await;

        assert_eq!(ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(pong_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrouted_interaction_is_a_no_op() {
        let dispatcher = Dispatcher::new(Registry::new(), RecordingBot::new());
        let event = TestInteraction::new(
            Interaction::UserContextMenu {
                command_id: "404".into(),
            },
            None,
        );
        let outcome = dispatcher.route_interaction(event).await;
        assert_eq!(outcome, RouteOutcome::Dispatched(DispatchReport {
            occurrences: 1,
            ..DispatchReport::default()
        }));
    }

    #[tokio::test]
    async fn test_autocomplete_answers_with_callback_choices() {
        let registry = poll_registry(CommandOption::new("template", "Template").autocomplete(
            autocomplete_fn(|input, _event| async move {
                Ok::<Vec<Choice>, HandlerError>(vec![Choice::new(format!("{input}-1"), "a")])
            }),
        ));
        let bot = RecordingBot::new();
        let dispatcher = Dispatcher::new(registry, bot.clone());

        let outcome = dispatcher
            .route_interaction(autocomplete_request("template", "yes"))
            .await;

        let expected = vec![Choice::new("yes-1", "a")];
        assert_eq!(outcome, RouteOutcome::Autocompleted(expected.clone()));
        assert_eq!(bot.autocompletes(), [expected]);
    }

    #[tokio::test]
    async fn test_failing_autocomplete_answers_empty() {
        let registry = poll_registry(CommandOption::new("template", "Template").autocomplete(
            autocomplete_fn(|_input, _event| async {
                Err::<Vec<Choice>, HandlerError>(HandlerError::new("lookup failed"))
            }),
        ));
        let bot = RecordingBot::new();
        let dispatcher = Dispatcher::new(registry, bot.clone());

        let outcome = dispatcher
            .route_interaction(autocomplete_request("template", ""))
            .await;

        assert_eq!(outcome, RouteOutcome::Autocompleted(Vec::new()));
        assert_eq!(bot.autocompletes(), [Vec::<Choice>::new()]);
    }

    #[tokio::test]
    async fn test_panicking_autocomplete_answers_empty() {
        let registry = poll_registry(CommandOption::new("template", "Template").autocomplete(
            autocomplete_fn(|_input, _event| async {
                if true {
                    panic!("index out of bounds");
                }
                Ok::<Vec<Choice>, HandlerError>(Vec::new())
            }),
        ));
        let bot = RecordingBot::new();
        let dispatcher = Dispatcher::new(registry, bot.clone());

        let outcome = dispatcher
            .route_interaction(autocomplete_request("template", ""))
            .await;
        assert_eq!(outcome, RouteOutcome::Autocompleted(Vec::new()));
        assert_eq!(bot.autocompletes().len(), 1);
    }

    #[tokio::test]
    async fn test_autocomplete_misses_answer_empty() {
        let bot = RecordingBot::new();
        let registry = poll_registry(CommandOption::new("question", "Question"));
        let dispatcher = Dispatcher::new(registry, bot.clone());

        // Option without autocomplete.
        let outcome = dispatcher
            .route_interaction(autocomplete_request("question", "wh"))
            .await;
        assert_eq!(outcome, RouteOutcome::Autocompleted(Vec::new()));

        // Unknown option.
        dispatcher
            .route_interaction(autocomplete_request("missing", ""))
            .await;

        // Unknown command.
        let empty = Dispatcher::new(Registry::new(), bot.clone());
        empty
            .route_interaction(autocomplete_request("question", ""))
            .await;

        assert_eq!(bot.autocompletes().len(), 3);
        assert!(bot.autocompletes().iter().all(Vec::is_empty));
    }

    #[tokio::test]
    async fn test_autocomplete_is_truncated() {
        let registry = poll_registry(CommandOption::new("n", "Number").autocomplete(
            autocomplete_fn(|_input, _event| async {
                Ok::<Vec<Choice>, HandlerError>((0..40).map(|i| Choice::new(i.to_string(), i)).collect())
            }),
        ));
        let bot = RecordingBot::new();
        let dispatcher = Dispatcher::new(registry, bot.clone()).with_settings(DispatchSettings {
            autocomplete_limit: 5,
            ..DispatchSettings::default()
        });

        dispatcher.route_interaction(autocomplete_request("n", "")).await;
        assert_eq!(bot.autocompletes()[0].len(), 5);
    }
}
