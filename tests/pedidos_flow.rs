use std::time::Duration;

use uuid::Uuid;

use mercado_express::{
    carrito::Carrito,
    db::crear_pool,
    error::AppError,
    models::{Condicion, DatosEnvio, Perfil},
    pedidos::{
        AlcancePedidos, DatosPedido, EstadoPago, EstadoPedido, LineaPedido, PedidoStore,
        PedidoStoreRemoto,
    },
    permisos::{Permisos, Rol},
    productos::{self, NuevoProducto},
    toast::ToastBus,
};

// Flujo de integración contra Postgres: compra desde el carrito,
// aprobación del pago y avance hasta entregado, más la compensación del
// guion de dos fases. Se omite cuando no hay base configurada.
#[tokio::test]
async fn compra_pago_y_compensacion() -> anyhow::Result<()> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Prueba omitida: define TEST_DATABASE_URL o DATABASE_URL para correr el flujo de integración."
                );
                return Ok(());
            }
        };

    let pool = crear_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    sqlx::query("TRUNCATE TABLE detalle_pedidos, pedidos, productos, categorias, auditoria, perfiles CASCADE")
        .execute(&pool)
        .await?;

    let comprador = crear_perfil(&pool, "comprador@test.bo", "usuario").await?;
    let vendedor = crear_perfil(&pool, "vendedor@test.bo", "vendedor").await?;

    let producto = productos::crear(
        &pool,
        &Permisos::de(Rol::Vendedor),
        vendedor.id,
        NuevoProducto {
            nombre: "Poncho de alpaca".to_string(),
            precio: 15_000,
            descripcion: Some("Tejido a mano".to_string()),
            imagen_url: None,
            imagenes_adicionales: Vec::new(),
            categoria_id: None,
            condicion: Condicion::Nuevo,
            stock: 4,
        },
    )
    .await?;

    let toasts = ToastBus::new();
    let store = PedidoStoreRemoto::new(
        pool.clone(),
        toasts.clone(),
        Duration::from_secs(18),
        Duration::from_secs(10),
    );

    // Compra desde el carrito.
    let mut carrito = Carrito::new(toasts.clone());
    carrito.agregar_item(&producto, 2);
    let pedido = carrito
        .crear_pedido_desde_carrito(
            &store,
            Some(&comprador),
            DatosEnvio {
                direccion: "Av. Arce 2500".to_string(),
                telefono: "76543210".to_string(),
                notas: None,
            },
        )
        .await
        .expect("el pedido debía crearse");
    assert_eq!(pedido.total, 30_000);
    assert!(carrito.esta_vacio());

    // La vista del vendedor une el perfil del comprador y el producto.
    let ventas = store.listar(AlcancePedidos::Vendedor(vendedor.id)).await?;
    assert_eq!(ventas.len(), 1);
    assert_eq!(
        ventas[0].comprador.as_ref().map(|p| p.id),
        Some(comprador.id)
    );
    assert_eq!(ventas[0].detalles.len(), 1);
    assert_eq!(
        ventas[0].detalles[0]
            .producto
            .as_ref()
            .map(|p| p.id),
        Some(producto.id)
    );

    // Comprobante y aprobación: el pedido pendiente pasa a confirmado.
    store
        .adjuntar_comprobante(pedido.id, "comprobantes/transferencia.jpg")
        .await?;
    let confirmado = store
        .actualizar_pago(pedido.id, EstadoPago::Aprobado)
        .await?;
    assert_eq!(confirmado.estado, EstadoPedido::Confirmado);
    assert_eq!(confirmado.estado_pago, EstadoPago::Aprobado);

    // Avance administrativo con sellado de marcas de tiempo.
    store
        .cambiar_estado(pedido.id, EstadoPedido::Procesando)
        .await?;
    let enviado = store
        .cambiar_estado(pedido.id, EstadoPedido::Enviado)
        .await?;
    let marca_envio = enviado.enviado_en.expect("marca de envío");
    let entregado = store
        .cambiar_estado(pedido.id, EstadoPedido::Entregado)
        .await?;
    assert_eq!(entregado.enviado_en, Some(marca_envio));
    assert!(entregado.entregado_en.is_some());

    // Un estado terminal ya no admite transiciones.
    let err = store
        .cambiar_estado(pedido.id, EstadoPedido::Cancelado)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validacion(_)));

    // Guion de dos fases: una línea con producto inexistente viola la
    // clave foránea y la cabecera recién creada se compensa con borrado.
    let err = store
        .crear_pedido(
            &DatosPedido {
                lineas: vec![LineaPedido {
                    producto_id: Uuid::new_v4(),
                    cantidad: 1,
                    precio_unitario: 1_000,
                }],
                direccion_envio: "Calle 1".to_string(),
                telefono_contacto: "70000002".to_string(),
                notas_cliente: None,
            },
            comprador.id,
            vendedor.id,
            EstadoPedido::Pendiente,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ReferenciaInvalida(_)));

    let propios = store
        .listar(AlcancePedidos::Comprador(comprador.id))
        .await?;
    assert_eq!(propios.len(), 1, "la cabecera huérfana fue compensada");

    Ok(())
}

async fn crear_perfil(pool: &sqlx::PgPool, email: &str, rol: &str) -> anyhow::Result<Perfil> {
    let fila: (Uuid, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        r#"
        INSERT INTO perfiles (id, email, password_hash, nombres, apellidos, rol)
        VALUES ($1, $2, 'dummy', 'Prueba', 'Integración', $3)
        RETURNING id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(rol)
    .fetch_one(pool)
    .await?;
    Ok(Perfil {
        id: fila.0,
        email: email.to_string(),
        password_hash: "dummy".to_string(),
        nombres: "Prueba".to_string(),
        apellidos: "Integración".to_string(),
        telefono: None,
        carnet: None,
        ciudad: None,
        avatar_url: None,
        rol: Rol::parse(rol),
        activo: true,
        descripcion_vendedor: None,
        qr_pago_url: None,
        plan: None,
        plan_expira: None,
        calificacion: None,
        created_at: fila.1,
        updated_at: fila.1,
    })
}
