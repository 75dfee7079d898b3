use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    auditoria::registrar_auditoria,
    db::DbPool,
    error::{clasificar_error_db, AppError, AppResult},
    models::{
        DetalleConProducto, DetallePedido, Pedido, PedidoConDetalles, Perfil, PerfilRow, Producto,
        ProductoRow,
    },
    pedidos::{
        generar_numero_pedido, AlcancePedidos, DatosPedido, EstadoPago, EstadoPedido, PedidoStore,
    },
    toast::ToastBus,
};

#[derive(Debug, FromRow)]
struct PedidoRow {
    id: Uuid,
    numero_pedido: String,
    comprador_id: Uuid,
    vendedor_id: Uuid,
    estado: String,
    estado_pago: String,
    subtotal: i64,
    total: i64,
    direccion_envio: String,
    telefono_contacto: String,
    notas_cliente: Option<String>,
    notas_admin: Option<String>,
    comprobante_path: Option<String>,
    enviado_en: Option<DateTime<Utc>>,
    entregado_en: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn pedido_from_row(row: PedidoRow) -> Pedido {
    Pedido {
        id: row.id,
        numero_pedido: row.numero_pedido,
        comprador_id: row.comprador_id,
        vendedor_id: row.vendedor_id,
        estado: EstadoPedido::parse(&row.estado).unwrap_or(EstadoPedido::Pendiente),
        estado_pago: EstadoPago::parse(&row.estado_pago).unwrap_or(EstadoPago::Pendiente),
        subtotal: row.subtotal,
        total: row.total,
        direccion_envio: row.direccion_envio,
        telefono_contacto: row.telefono_contacto,
        notas_cliente: row.notas_cliente,
        notas_admin: row.notas_admin,
        comprobante_path: row.comprobante_path,
        enviado_en: row.enviado_en,
        entregado_en: row.entregado_en,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// Detalle unido a la instantánea del producto. El producto puede faltar
/// si fue eliminado después del pedido.
#[derive(Debug, FromRow)]
struct DetalleProductoRow {
    id: Uuid,
    pedido_id: Uuid,
    producto_id: Uuid,
    cantidad: i32,
    precio_unitario: i64,
    subtotal: i64,
    prod_id: Option<Uuid>,
    prod_nombre: Option<String>,
    prod_precio: Option<i64>,
    prod_descripcion: Option<String>,
    prod_imagen_url: Option<String>,
    prod_imagenes_adicionales: Option<Vec<String>>,
    prod_categoria_id: Option<Uuid>,
    prod_condicion: Option<String>,
    prod_stock: Option<i32>,
    prod_activo: Option<bool>,
    prod_destacado: Option<bool>,
    prod_vendedor_id: Option<Uuid>,
    prod_created_at: Option<DateTime<Utc>>,
    prod_updated_at: Option<DateTime<Utc>>,
}

fn detalle_from_row(row: DetalleProductoRow) -> DetalleConProducto {
    let producto = row.prod_id.map(|prod_id| {
        Producto::from(ProductoRow {
            id: prod_id,
            nombre: row.prod_nombre.unwrap_or_default(),
            precio: row.prod_precio.unwrap_or_default(),
            descripcion: row.prod_descripcion,
            imagen_url: row.prod_imagen_url,
            imagenes_adicionales: row.prod_imagenes_adicionales.unwrap_or_default(),
            categoria_id: row.prod_categoria_id,
            condicion: row.prod_condicion.unwrap_or_default(),
            stock: row.prod_stock.unwrap_or_default(),
            activo: row.prod_activo.unwrap_or_default(),
            destacado: row.prod_destacado.unwrap_or_default(),
            vendedor_id: row.prod_vendedor_id,
            created_at: row.prod_created_at.unwrap_or_else(Utc::now),
            updated_at: row.prod_updated_at.unwrap_or_else(Utc::now),
        })
    });
    DetalleConProducto {
        detalle: DetallePedido {
            id: row.id,
            pedido_id: row.pedido_id,
            producto_id: row.producto_id,
            cantidad: row.cantidad,
            precio_unitario: row.precio_unitario,
            subtotal: row.subtotal,
        },
        producto,
    }
}

const SELECT_DETALLES: &str = r#"
    SELECT d.id, d.pedido_id, d.producto_id, d.cantidad, d.precio_unitario, d.subtotal,
           p.id AS prod_id, p.nombre AS prod_nombre, p.precio AS prod_precio,
           p.descripcion AS prod_descripcion, p.imagen_url AS prod_imagen_url,
           p.imagenes_adicionales AS prod_imagenes_adicionales,
           p.categoria_id AS prod_categoria_id, p.condicion AS prod_condicion,
           p.stock AS prod_stock, p.activo AS prod_activo, p.destacado AS prod_destacado,
           p.vendedor_id AS prod_vendedor_id, p.created_at AS prod_created_at,
           p.updated_at AS prod_updated_at
    FROM detalle_pedidos d
    LEFT JOIN productos p ON p.id = d.producto_id
    WHERE d.pedido_id = ANY($1)
"#;

/// Almacén de pedidos contra Postgres. Toda llamada de red corre en
/// carrera contra un temporizador; al vencer se reporta
/// `AppError::Timeout` aunque la consulta siga en vuelo y pueda todavía
/// completarse en el backend (carrera aceptada, no mitigada).
pub struct PedidoStoreRemoto {
    pool: DbPool,
    toasts: ToastBus,
    timeout_pedido: Duration,
    timeout_detalles: Duration,
}

impl PedidoStoreRemoto {
    pub fn new(
        pool: DbPool,
        toasts: ToastBus,
        timeout_pedido: Duration,
        timeout_detalles: Duration,
    ) -> Self {
        Self {
            pool,
            toasts,
            timeout_pedido,
            timeout_detalles,
        }
    }

    async fn insertar_cabecera(
        &self,
        datos: &DatosPedido,
        comprador_id: Uuid,
        vendedor_id: Uuid,
        estado_inicial: EstadoPedido,
    ) -> AppResult<Pedido> {
        let subtotal = datos.subtotal();
        let id = Uuid::new_v4();
        let numero = generar_numero_pedido(id);

        let insercion = sqlx::query_as::<_, PedidoRow>(
            r#"
            INSERT INTO pedidos
                (id, numero_pedido, comprador_id, vendedor_id, estado, estado_pago,
                 subtotal, total, direccion_envio, telefono_contacto, notas_cliente)
            VALUES ($1, $2, $3, $4, $5, 'pendiente', $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&numero)
        .bind(comprador_id)
        .bind(vendedor_id)
        .bind(estado_inicial.as_str())
        .bind(subtotal)
        .bind(subtotal)
        .bind(&datos.direccion_envio)
        .bind(&datos.telefono_contacto)
        .bind(&datos.notas_cliente)
        .fetch_one(&self.pool);

        match tokio::time::timeout(self.timeout_pedido, insercion).await {
            Err(_) => Err(AppError::Timeout("creación del pedido")),
            Ok(Err(err)) => Err(clasificar_error_db(err)),
            Ok(Ok(row)) => Ok(pedido_from_row(row)),
        }
    }

    async fn insertar_detalles(&self, pedido_id: Uuid, datos: &DatosPedido) -> AppResult<()> {
        let insercion = async {
            for linea in &datos.lineas {
                sqlx::query(
                    r#"
                    INSERT INTO detalle_pedidos
                        (id, pedido_id, producto_id, cantidad, precio_unitario, subtotal)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(pedido_id)
                .bind(linea.producto_id)
                .bind(linea.cantidad)
                .bind(linea.precio_unitario)
                .bind(linea.precio_unitario * i64::from(linea.cantidad))
                .execute(&self.pool)
                .await?;
            }
            Ok::<_, sqlx::Error>(())
        };

        match tokio::time::timeout(self.timeout_detalles, insercion).await {
            Err(_) => Err(AppError::Timeout("detalle del pedido")),
            Ok(Err(err)) => Err(clasificar_error_db(err)),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Paso de compensación del guion de dos fases: borra la cabecera
    /// recién creada cuando la inserción de detalles falló. Mejor
    /// esfuerzo: si el borrado también falla queda una cabecera huérfana
    /// y solo se deja constancia en el log.
    async fn compensar_cabecera(&self, pedido_id: Uuid) {
        let resultado = sqlx::query("DELETE FROM pedidos WHERE id = $1")
            .bind(pedido_id)
            .execute(&self.pool)
            .await;
        if let Err(err) = resultado {
            tracing::warn!(
                pedido_id = %pedido_id,
                error = %err,
                "compensación fallida: cabecera de pedido huérfana"
            );
        }
    }

    async fn detalles_de(&self, pedido_ids: &[Uuid]) -> AppResult<Vec<DetalleProductoRow>> {
        let consulta = sqlx::query_as::<_, DetalleProductoRow>(SELECT_DETALLES)
            .bind(pedido_ids)
            .fetch_all(&self.pool);
        match tokio::time::timeout(self.timeout_detalles, consulta).await {
            Err(_) => Err(AppError::Timeout("lectura de detalles")),
            Ok(Err(err)) => Err(clasificar_error_db(err)),
            Ok(Ok(rows)) => Ok(rows),
        }
    }

    async fn perfiles_de(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Perfil>> {
        let consulta = sqlx::query_as::<_, PerfilRow>("SELECT * FROM perfiles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool);
        let rows = match tokio::time::timeout(self.timeout_detalles, consulta).await {
            Err(_) => return Err(AppError::Timeout("lectura de perfiles")),
            Ok(Err(err)) => return Err(clasificar_error_db(err)),
            Ok(Ok(rows)) => rows,
        };
        Ok(rows
            .into_iter()
            .map(|row| (row.id, Perfil::from(row)))
            .collect())
    }

    async fn cargar_pedido(&self, id: Uuid) -> AppResult<Pedido> {
        let row: Option<PedidoRow> = sqlx::query_as("SELECT * FROM pedidos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(clasificar_error_db)?;
        match row {
            Some(row) => Ok(pedido_from_row(row)),
            None => Err(AppError::NoEncontrado),
        }
    }
}

#[async_trait::async_trait]
impl PedidoStore for PedidoStoreRemoto {
    async fn crear_pedido(
        &self,
        datos: &DatosPedido,
        comprador_id: Uuid,
        vendedor_id: Uuid,
        estado_inicial: EstadoPedido,
    ) -> AppResult<Pedido> {
        if datos.lineas.is_empty() {
            let err = AppError::Validacion("el pedido no tiene productos".to_string());
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        let pedido = match self
            .insertar_cabecera(datos, comprador_id, vendedor_id, estado_inicial)
            .await
        {
            Ok(pedido) => pedido,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        if let Err(err) = self.insertar_detalles(pedido.id, datos).await {
            self.compensar_cabecera(pedido.id).await;
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        tracing::info!(
            pedido_id = %pedido.id,
            numero = %pedido.numero_pedido,
            total = pedido.total,
            "pedido creado"
        );
        self.toasts
            .exito_con_titulo("Pedido creado", format!("Pedido {}", pedido.numero_pedido));
        Ok(pedido)
    }

    async fn pedido(&self, id: Uuid) -> AppResult<PedidoConDetalles> {
        let pedido = self.cargar_pedido(id).await?;
        let detalles = self
            .detalles_de(&[pedido.id])
            .await?
            .into_iter()
            .map(detalle_from_row)
            .collect();
        let comprador = self
            .perfiles_de(&[pedido.comprador_id])
            .await?
            .remove(&pedido.comprador_id);
        Ok(PedidoConDetalles {
            pedido,
            detalles,
            comprador,
        })
    }

    async fn listar(&self, alcance: AlcancePedidos) -> AppResult<Vec<PedidoConDetalles>> {
        let consulta = match alcance {
            AlcancePedidos::Todos => {
                sqlx::query_as::<_, PedidoRow>("SELECT * FROM pedidos ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
            }
            AlcancePedidos::Comprador(id) => sqlx::query_as::<_, PedidoRow>(
                "SELECT * FROM pedidos WHERE comprador_id = $1 ORDER BY created_at DESC",
            )
            .bind(id)
            .fetch_all(&self.pool),
            AlcancePedidos::Vendedor(id) => sqlx::query_as::<_, PedidoRow>(
                "SELECT * FROM pedidos WHERE vendedor_id = $1 ORDER BY created_at DESC",
            )
            .bind(id)
            .fetch_all(&self.pool),
        };

        let rows = match tokio::time::timeout(self.timeout_pedido, consulta).await {
            Err(_) => return Err(AppError::Timeout("lectura de pedidos")),
            Ok(Err(err)) => return Err(clasificar_error_db(err)),
            Ok(Ok(rows)) => rows,
        };

        let pedidos: Vec<Pedido> = rows.into_iter().map(pedido_from_row).collect();
        if pedidos.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = pedidos.iter().map(|p| p.id).collect();
        let mut detalles_por_pedido: HashMap<Uuid, Vec<DetalleConProducto>> = HashMap::new();
        for row in self.detalles_de(&ids).await? {
            detalles_por_pedido
                .entry(row.pedido_id)
                .or_default()
                .push(detalle_from_row(row));
        }

        // El perfil de la contraparte solo se une para las vistas de
        // admin y de vendedor.
        let mut compradores = HashMap::new();
        if !matches!(alcance, AlcancePedidos::Comprador(_)) {
            let comprador_ids: Vec<Uuid> = pedidos.iter().map(|p| p.comprador_id).collect();
            compradores = self.perfiles_de(&comprador_ids).await?;
        }

        Ok(pedidos
            .into_iter()
            .map(|pedido| {
                let detalles = detalles_por_pedido.remove(&pedido.id).unwrap_or_default();
                let comprador = compradores.get(&pedido.comprador_id).cloned();
                PedidoConDetalles {
                    pedido,
                    detalles,
                    comprador,
                }
            })
            .collect())
    }

    async fn cambiar_estado(&self, id: Uuid, nuevo: EstadoPedido) -> AppResult<Pedido> {
        let resultado = async {
            let actual = self.cargar_pedido(id).await?;
            if !actual.estado.puede_transicionar_a(nuevo) {
                return Err(AppError::Validacion(format!(
                    "no se puede pasar de {} a {}",
                    actual.estado.nombre(),
                    nuevo.nombre()
                )));
            }

            // Entrar a enviado/entregado sella su marca de tiempo una
            // sola vez; marcas previas quedan intactas.
            let row: PedidoRow = sqlx::query_as(
                r#"
                UPDATE pedidos SET
                    estado = $2,
                    enviado_en = CASE WHEN $2 = 'enviado' THEN now() ELSE enviado_en END,
                    entregado_en = CASE WHEN $2 = 'entregado' THEN now() ELSE entregado_en END,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(nuevo.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(clasificar_error_db)?;
            Ok(pedido_from_row(row))
        }
        .await;

        let pedido = match resultado {
            Ok(pedido) => pedido,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        if let Err(err) = registrar_auditoria(
            &self.pool,
            None,
            "pedido_cambio_estado",
            Some("pedidos"),
            Some(serde_json::json!({ "pedido_id": id, "estado": nuevo.as_str() })),
        )
        .await
        {
            tracing::warn!(error = %err, "registro de auditoría fallido");
        }

        self.toasts
            .info(format!("Pedido actualizado a {}", nuevo.nombre()));
        Ok(pedido)
    }

    async fn actualizar_pago(&self, id: Uuid, estado: EstadoPago) -> AppResult<Pedido> {
        let resultado: AppResult<Pedido> = async {
            let actual = self.cargar_pedido(id).await?;
            // Aprobar el pago confirma el pedido solo si seguía
            // pendiente; nunca regresa un pedido ya avanzado.
            let nuevo_estado = if estado == EstadoPago::Aprobado
                && actual.estado == EstadoPedido::Pendiente
            {
                EstadoPedido::Confirmado
            } else {
                actual.estado
            };

            let row: PedidoRow = sqlx::query_as(
                "UPDATE pedidos SET estado_pago = $2, estado = $3, updated_at = now() WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(estado.as_str())
            .bind(nuevo_estado.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(clasificar_error_db)?;
            Ok(pedido_from_row(row))
        }
        .await;

        let pedido = match resultado {
            Ok(pedido) => pedido,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        match estado {
            EstadoPago::Aprobado => self.toasts.exito("Pago aprobado"),
            EstadoPago::Rechazado => self.toasts.advertencia("Pago rechazado"),
            EstadoPago::Pendiente => self.toasts.info("Pago marcado como pendiente"),
        };
        Ok(pedido)
    }

    async fn adjuntar_comprobante(&self, id: Uuid, ruta: &str) -> AppResult<Pedido> {
        let resultado = sqlx::query_as::<_, PedidoRow>(
            "UPDATE pedidos SET comprobante_path = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ruta)
        .fetch_optional(&self.pool)
        .await
        .map_err(clasificar_error_db)
        .and_then(|fila| fila.ok_or(AppError::NoEncontrado));

        let row = match resultado {
            Ok(row) => row,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        self.toasts.exito("Comprobante de pago enviado");
        Ok(pedido_from_row(row))
    }
}
