use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use super::load_nest;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StreamQuery {
    pub nest: Option<String>,
}

/// Live feed of the wall, or of one public nest with `?nest=<id>`.
/// Browsers cannot attach a bearer token to EventSource, so private nests
/// are not streamed.
pub async fn sse_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StreamQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let nest_id = match query.nest {
        Some(id) => {
            let nest = load_nest(&state, &id).await?;
            if nest.is_private {
                return Err(ApiError::forbidden("Private nests cannot be streamed."));
            }
            Some(nest.id)
        }
        None => None,
    };

    let rx = state.tx_events.subscribe();
    tracing::info!("SSE connected: nest={:?}", nest_id);

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            if event.nest_id() != nest_id.as_deref() {
                return None;
            }
            Some(
                event
                    .payload()
                    .map_err(axum::Error::new)
                    .and_then(|data| Event::default().event(event.event_name()).json_data(data))
                    .map_err(|e| {
                        tracing::error!("SSE serialization error: {}", e);
                        e
                    }),
            )
        }
        Err(lagged) => {
            tracing::warn!("SSE client lagged on nest={:?}: {}", nest_id, lagged);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15))))
}
