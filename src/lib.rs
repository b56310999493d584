//! OpenAPI Language Server implementation.
//!
//! Provides go to definition and find references for `$ref` pointers in
//! YAML API descriptions, kept in sync with the editor through incremental
//! text edits.

use std::path::PathBuf;

use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};
use tracing::{debug, info, warn};

mod document;
mod lsp;
pub mod settings;
mod structure;

pub use document::{
    utf16_len, BufferError, DocumentError, DocumentState, DocumentStore, ForestState, TextBuffer,
};
pub use lsp::{definition_at_position, references_at_position};
pub use settings::{discover_settings, load_settings, Settings};
pub use structure::{parse, pointer_of, resolve, Forest, Node, NodeId};

pub struct Backend {
    client: Client,
    documents: DocumentStore,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            documents: DocumentStore::new(),
        }
    }
}

/// Capabilities advertised in the `initialize` response.
pub fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                ..Default::default()
            },
        )),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

/// Workspace root from the first workspace folder, falling back to `root_uri`.
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .and_then(|f| f.uri.to_file_path().ok())
        .or_else(|| {
            #[allow(deprecated)]
            params.root_uri.as_ref()?.to_file_path().ok()
        })
}

fn request_error(err: DocumentError) -> Error {
    warn!("{err}");
    Error::invalid_params(err.to_string())
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(client) = &params.client_info {
            info!(
                name = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                "connected to client"
            );
        }

        match workspace_root(&params) {
            Some(root) => info!(root = %root.display(), "workspace root"),
            None => info!("no workspace root"),
        }

        Ok(InitializeResult {
            capabilities: capabilities(),
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "OpenAPI language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        debug!(uri = %doc.uri, version = doc.version, "did_open");
        self.documents.open(doc.uri, doc.text, doc.version);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let doc = params.text_document;
        debug!(
            uri = %doc.uri,
            version = doc.version,
            changes = params.content_changes.len(),
            "did_change"
        );

        if let Err(err) = self
            .documents
            .change(&doc.uri, &params.content_changes, doc.version)
        {
            warn!(uri = %doc.uri, "failed to apply changes: {err}");
            self.client
                .log_message(
                    MessageType::ERROR,
                    format!("failed to apply changes to {}: {}", doc.uri, err),
                )
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!(uri = %params.text_document.uri, "did_close");
        self.documents.close(&params.text_document.uri);
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let location =
            lsp::definition_at_position(&self.documents, uri, position).map_err(request_error)?;
        debug!(%uri, line = position.line, found = location.is_some(), "goto_definition");

        Ok(location.map(GotoDefinitionResponse::Scalar))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let locations =
            lsp::references_at_position(&self.documents, uri, position).map_err(request_error)?;
        debug!(%uri, line = position.line, count = locations.len(), "references");

        Ok(Some(locations))
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(Backend::new)
}
