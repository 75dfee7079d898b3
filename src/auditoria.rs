use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Registra una acción administrativa. Los llamadores tratan el fallo
/// como no fatal: lo reportan con `tracing::warn!` y continúan.
pub async fn registrar_auditoria(
    pool: &DbPool,
    usuario_id: Option<Uuid>,
    accion: &str,
    recurso: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO auditoria (id, usuario_id, accion, recurso, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(usuario_id)
    .bind(accion)
    .bind(recurso)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
