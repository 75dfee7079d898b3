use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    auditoria::registrar_auditoria,
    db::DbPool,
    error::{AppError, AppResult, clasificar_error_db},
    models::{Condicion, Producto, ProductoRow},
    permisos::{Permiso, Permisos, asegurar_permiso},
};

#[derive(Debug, Default, Deserialize)]
pub struct Paginacion {
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

impl Paginacion {
    pub fn normalizar(&self) -> (i64, i64, i64) {
        let pagina = self.pagina.unwrap_or(1).max(1);
        let por_pagina = self.por_pagina.unwrap_or(20).clamp(1, 100);
        let offset = (pagina - 1) * por_pagina;
        (pagina, por_pagina, offset)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsultaProductos {
    #[serde(flatten)]
    pub paginacion: Paginacion,
    pub q: Option<String>,
    pub categoria_id: Option<Uuid>,
    pub vendedor_id: Option<Uuid>,
    pub precio_min: Option<i64>,
    pub precio_max: Option<i64>,
    pub solo_activos: bool,
    pub solo_destacados: bool,
}

#[derive(Debug, Deserialize)]
pub struct NuevoProducto {
    pub nombre: String,
    pub precio: i64,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub imagenes_adicionales: Vec<String>,
    pub categoria_id: Option<Uuid>,
    pub condicion: Condicion,
    pub stock: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CambiosProducto {
    pub nombre: Option<String>,
    pub precio: Option<i64>,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub condicion: Option<Condicion>,
    pub stock: Option<i32>,
    pub activo: Option<bool>,
    pub destacado: Option<bool>,
}

pub async fn listar(
    pool: &DbPool,
    consulta: &ConsultaProductos,
) -> AppResult<(Vec<Producto>, i64)> {
    let (_, limite, offset) = consulta.paginacion.normalizar();

    let mut builder = QueryBuilder::new("SELECT * FROM productos WHERE 1=1");
    aplicar_filtros(&mut builder, consulta);
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(limite);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let filas: Vec<ProductoRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(clasificar_error_db)?;

    let mut contador = QueryBuilder::new("SELECT COUNT(*) FROM productos WHERE 1=1");
    aplicar_filtros(&mut contador, consulta);
    let total: (i64,) = contador
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(clasificar_error_db)?;

    Ok((filas.into_iter().map(Producto::from).collect(), total.0))
}

fn aplicar_filtros(builder: &mut QueryBuilder<'_, sqlx::Postgres>, consulta: &ConsultaProductos) {
    if let Some(q) = consulta.q.as_ref().filter(|s| !s.is_empty()) {
        let patron = format!("%{q}%");
        builder.push(" AND (nombre ILIKE ");
        builder.push_bind(patron.clone());
        builder.push(" OR descripcion ILIKE ");
        builder.push_bind(patron);
        builder.push(")");
    }
    if let Some(categoria) = consulta.categoria_id {
        builder.push(" AND categoria_id = ");
        builder.push_bind(categoria);
    }
    if let Some(vendedor) = consulta.vendedor_id {
        builder.push(" AND vendedor_id = ");
        builder.push_bind(vendedor);
    }
    if let Some(min) = consulta.precio_min {
        builder.push(" AND precio >= ");
        builder.push_bind(min);
    }
    if let Some(max) = consulta.precio_max {
        builder.push(" AND precio <= ");
        builder.push_bind(max);
    }
    if consulta.solo_activos {
        builder.push(" AND activo = TRUE");
    }
    if consulta.solo_destacados {
        builder.push(" AND destacado = TRUE");
    }
}

pub async fn obtener(pool: &DbPool, id: Uuid) -> AppResult<Producto> {
    let fila: Option<ProductoRow> = sqlx::query_as("SELECT * FROM productos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(clasificar_error_db)?;
    fila.map(Producto::from).ok_or(AppError::NoEncontrado)
}

/// Publica un producto. Un vendedor publica a su propio nombre; quien
/// gestiona productos puede publicar para cualquier vendedor.
pub async fn crear(
    pool: &DbPool,
    permisos: &Permisos,
    actor_id: Uuid,
    datos: NuevoProducto,
) -> AppResult<Producto> {
    if !permisos.puede_gestionar_productos() && !permisos.puede_vender() {
        return Err(AppError::PermisoDenegado);
    }
    if datos.precio <= 0 {
        return Err(AppError::Validacion(
            "el precio debe ser mayor a cero".to_string(),
        ));
    }
    if datos.stock < 0 {
        return Err(AppError::Validacion(
            "el stock no puede ser negativo".to_string(),
        ));
    }

    let fila: ProductoRow = sqlx::query_as(
        r#"
        INSERT INTO productos
            (id, nombre, precio, descripcion, imagen_url, imagenes_adicionales,
             categoria_id, condicion, stock, vendedor_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&datos.nombre)
    .bind(datos.precio)
    .bind(&datos.descripcion)
    .bind(&datos.imagen_url)
    .bind(&datos.imagenes_adicionales)
    .bind(datos.categoria_id)
    .bind(datos.condicion.as_str())
    .bind(datos.stock)
    .bind(actor_id)
    .fetch_one(pool)
    .await
    .map_err(clasificar_error_db)?;

    let producto = Producto::from(fila);
    if let Err(err) = registrar_auditoria(
        pool,
        Some(actor_id),
        "producto_creado",
        Some("productos"),
        Some(serde_json::json!({ "producto_id": producto.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "registro de auditoría fallido");
    }
    Ok(producto)
}

pub async fn actualizar(
    pool: &DbPool,
    permisos: &Permisos,
    actor_id: Uuid,
    id: Uuid,
    cambios: CambiosProducto,
) -> AppResult<Producto> {
    let existente = obtener(pool, id).await?;
    if existente.vendedor_id != Some(actor_id) {
        asegurar_permiso(permisos, Permiso::GestionarProductos)?;
    }
    if cambios.stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validacion(
            "el stock no puede ser negativo".to_string(),
        ));
    }

    let fila: ProductoRow = sqlx::query_as(
        r#"
        UPDATE productos SET
            nombre = COALESCE($2, nombre),
            precio = COALESCE($3, precio),
            descripcion = COALESCE($4, descripcion),
            imagen_url = COALESCE($5, imagen_url),
            condicion = COALESCE($6, condicion),
            stock = COALESCE($7, stock),
            activo = COALESCE($8, activo),
            destacado = COALESCE($9, destacado),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(cambios.nombre)
    .bind(cambios.precio)
    .bind(cambios.descripcion)
    .bind(cambios.imagen_url)
    .bind(cambios.condicion.map(|c| c.as_str()))
    .bind(cambios.stock)
    .bind(cambios.activo)
    .bind(cambios.destacado)
    .fetch_one(pool)
    .await
    .map_err(clasificar_error_db)?;

    if let Err(err) = registrar_auditoria(
        pool,
        Some(actor_id),
        "producto_actualizado",
        Some("productos"),
        Some(serde_json::json!({ "producto_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "registro de auditoría fallido");
    }
    Ok(Producto::from(fila))
}

pub async fn eliminar(
    pool: &DbPool,
    permisos: &Permisos,
    actor_id: Uuid,
    id: Uuid,
) -> AppResult<()> {
    let existente = obtener(pool, id).await?;
    if existente.vendedor_id != Some(actor_id) {
        asegurar_permiso(permisos, Permiso::EliminarProductos)?;
    }

    let resultado = sqlx::query("DELETE FROM productos WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(clasificar_error_db)?;
    if resultado.rows_affected() == 0 {
        return Err(AppError::NoEncontrado);
    }

    if let Err(err) = registrar_auditoria(
        pool,
        Some(actor_id),
        "producto_eliminado",
        Some("productos"),
        Some(serde_json::json!({ "producto_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "registro de auditoría fallido");
    }
    Ok(())
}

/// Ajusta el stock en `delta` unidades. El stock nunca queda negativo.
pub async fn ajustar_stock(
    pool: &DbPool,
    permisos: &Permisos,
    actor_id: Uuid,
    id: Uuid,
    delta: i32,
) -> AppResult<Producto> {
    if delta == 0 {
        return Err(AppError::Validacion("delta no puede ser cero".to_string()));
    }
    let existente = obtener(pool, id).await?;
    if existente.vendedor_id != Some(actor_id) {
        asegurar_permiso(permisos, Permiso::GestionarProductos)?;
    }
    if existente.stock + delta < 0 {
        return Err(AppError::Validacion(
            "el stock no puede quedar negativo".to_string(),
        ));
    }

    let fila: ProductoRow = sqlx::query_as(
        "UPDATE productos SET stock = stock + $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(delta)
    .fetch_one(pool)
    .await
    .map_err(clasificar_error_db)?;

    Ok(Producto::from(fila))
}
