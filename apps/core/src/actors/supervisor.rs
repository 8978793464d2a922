use crate::actors::llm::LlmActorHandle;
use crate::actors::messages::{AppError, ChatMessage, SupervisorMessage, TurnReply};
use crate::actors::rag::RagActorHandle;
use crate::actors::traits::{LlmActor, RagActor};
use crate::brain::ChatRouter;
use crate::config::AppConfig;
use crate::models::{ConversationSession, Message, Role};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument};

const TURN_TIMEOUT: Duration = Duration::from_secs(120);
const SESSION_TIMEOUT: Duration = Duration::from_secs(30);
const INGEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A handle to the `SupervisorActor`.
///
/// This is the primary entry point for all business logic in the application. It owns the
/// conversation sessions and the chat router, and calls the `LlmActor` and `RagActor` when a
/// turn needs a model-backed answer.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
}

impl SupervisorHandle {
    /// Creates a new `SupervisorActor` and its children (`LlmActor`, `RagActor`) from the
    /// application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_actors(
            config,
            ChatRouter::from_config(&config.router),
            Arc::new(LlmActorHandle::new(config.llm.clone())),
            Arc::new(RagActorHandle::new(&config.retrieval)),
        )
    }

    /// Creates a `SupervisorActor` around explicit collaborators.
    ///
    /// Useful for tests, allowing injection of mock actors and a seeded router.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the prompt template and the retrieval depth.
    /// * `router` - Classifies turns and composes the replies.
    /// * `llm_actor` / `rag_actor` - Collaborators used for model-backed answers.
    pub fn with_actors<L, R>(
        config: &AppConfig,
        router: ChatRouter,
        llm_actor: Arc<L>,
        rag_actor: Arc<R>,
    ) -> Self
    where
        L: LlmActor,
        R: RagActor,
    {
        let (sender, receiver) = mpsc::channel(32);
        let actor = SupervisorRunner {
            receiver,
            router,
            sessions: HashMap::new(),
            llm_actor,
            rag_actor,
            prompt_template: config.llm.prompt_template.clone(),
            top_k: config.retrieval.top_k,
        };
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    /// Opens a new conversation and returns its id.
    ///
    /// The transcript of a fresh session holds only the greeting.
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<String, AppError> {
        let (send, recv) = oneshot::channel();
        self.dispatch(SupervisorMessage::CreateSession { responder: send })
            .await?;
        timeout(SESSION_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Processes a user message from a specific session.
    ///
    /// 1. Appends the user message to the transcript.
    /// 2. Routes it; canned categories are answered from templates.
    /// 3. Otherwise searches the knowledge base, builds the prompt and asks the LLM.
    /// 4. Appends the assistant reply and returns it.
    ///
    /// Collaborator failures never surface here; they are replaced by the
    /// technical-support fallback.
    #[instrument(skip(self, content))]
    pub async fn process_message(
        &self,
        session_id: String,
        content: String,
    ) -> Result<TurnReply, AppError> {
        let (send, recv) = oneshot::channel();
        self.dispatch(SupervisorMessage::ProcessUserMessage {
            session_id,
            content,
            responder: send,
        })
        .await?;
        timeout(TURN_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Resets a session to its greeting.
    #[instrument(skip(self))]
    pub async fn clear_session(&self, session_id: String) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        self.dispatch(SupervisorMessage::ClearSession {
            session_id,
            responder: send,
        })
        .await?;
        timeout(SESSION_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Returns a copy of a session transcript, oldest message first.
    pub async fn transcript(&self, session_id: String) -> Result<Vec<Message>, AppError> {
        let (send, recv) = oneshot::channel();
        self.dispatch(SupervisorMessage::GetTranscript {
            session_id,
            responder: send,
        })
        .await?;
        timeout(SESSION_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Ingests content into the knowledge base.
    ///
    /// This method delegates the request to the `RagActor` and returns the number of
    /// chunks stored.
    #[instrument(skip(self, content))]
    pub async fn ingest_content(
        &self,
        content: String,
        source: Option<String>,
    ) -> Result<usize, AppError> {
        let (send, recv) = oneshot::channel();
        self.dispatch(SupervisorMessage::IngestContent {
            content,
            source,
            responder: send,
        })
        .await?;
        timeout(INGEST_TIMEOUT, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Stops the supervisor. Later calls on any handle fail with `AppError::Actor`.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.dispatch(SupervisorMessage::Shutdown).await
    }

    async fn dispatch(&self, msg: SupervisorMessage) -> Result<(), AppError> {
        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Actor(e.to_string()))
    }
}

// --- Actor Runner ---
struct SupervisorRunner<L, R>
where
    L: LlmActor,
    R: RagActor,
{
    receiver: mpsc::Receiver<SupervisorMessage>,
    router: ChatRouter,
    sessions: HashMap<String, ConversationSession>,
    llm_actor: Arc<L>,
    rag_actor: Arc<R>,
    prompt_template: String,
    top_k: usize,
}

impl<L, R> SupervisorRunner<L, R>
where
    L: LlmActor,
    R: RagActor,
{
    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if let SupervisorMessage::Shutdown = msg {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg).await;
        }
        info!("Supervisor stopped");
    }

    async fn handle_message(&mut self, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::CreateSession { responder } => {
                let session = ConversationSession::new(self.router.templates().greeting.clone());
                let id = session.id.clone();
                self.sessions.insert(id.clone(), session);
                info!(session_id = %id, "session created");
                let _ = responder.send(Ok(id));
            }
            SupervisorMessage::ProcessUserMessage {
                session_id,
                content,
                responder,
            } => {
                let result = self.handle_user_message(session_id, content).await;
                if let Err(e) = &result {
                    error!("Error processing user message: {:?}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::ClearSession {
                session_id,
                responder,
            } => {
                let result = self.session_mut(&session_id).map(ConversationSession::clear);
                let _ = responder.send(result);
            }
            SupervisorMessage::GetTranscript {
                session_id,
                responder,
            } => {
                let result = self
                    .session_mut(&session_id)
                    .map(|session| session.messages().to_vec());
                let _ = responder.send(result);
            }
            SupervisorMessage::IngestContent {
                content,
                source,
                responder,
            } => {
                info!("Supervisor orchestrating ingestion...");
                let result = self.rag_actor.ingest(content, source).await;
                if let Err(e) = &result {
                    error!("Error ingesting content: {:?}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::Shutdown => {}
        }
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut ConversationSession, AppError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown session: {}", session_id)))
    }

    #[instrument(skip(self, content))]
    async fn handle_user_message(
        &mut self,
        session_id: String,
        content: String,
    ) -> Result<TurnReply, AppError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown session: {}", session_id)))?;

        let history = session.history_text();
        session.append(Role::User, content.clone());

        let llm = Arc::clone(&self.llm_actor);
        let rag = Arc::clone(&self.rag_actor);
        let template = self.prompt_template.clone();
        let top_k = self.top_k;
        let question = content.clone();

        let mut model_answer: Option<String> = None;
        let answered = &mut model_answer;
        let outcome = self
            .router
            .handle_turn_async(&content, move || async move {
                let result = answer_from_model(llm, rag, template, top_k, history, question).await;
                if let Ok(answer) = &result {
                    *answered = Some(answer.clone());
                }
                result
            })
            .await;

        if let Some(answer) = model_answer {
            session.remember_exchange(content, answer);
        }
        session.append(Role::Assistant, outcome.response.clone());

        Ok(TurnReply {
            session_id,
            category: outcome.category,
            content: outcome.response,
        })
    }
}

/// Retrieval-augmented answer: knowledge-base snippets plus conversation history
/// rendered into the prompt template, then a single completion.
async fn answer_from_model<L, R>(
    llm: Arc<L>,
    rag: Arc<R>,
    template: String,
    top_k: usize,
    history: String,
    question: String,
) -> Result<String, AppError>
where
    L: LlmActor,
    R: RagActor,
{
    let snippets = rag
        .search(question.clone(), top_k)
        .await
        .map_err(AppError::into_model_unavailable)?;
    debug!(snippets = snippets.len(), "context retrieved");

    let context = snippets
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<&str>>()
        .join("\n\n");
    let prompt = build_final_prompt(&template, &history, &context, &question);

    llm.complete(vec![ChatMessage::user(prompt)])
        .await
        .map_err(AppError::into_model_unavailable)
}

fn build_final_prompt(template: &str, history: &str, context: &str, question: &str) -> String {
    template
        .replace("{context}", context)
        .replace("{chat_history}", history)
        .replace("{question}", question)
}
