use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use mercado_express::{
    almacen::{self, Almacen, BUCKET_COMPROBANTES},
    carrito::Carrito,
    config::AppConfig,
    models::{Condicion, DatosEnvio, Perfil, Producto, formatear_bs},
    pedidos::{self, EstadoPedido},
    permisos::Rol,
    toast::ToastBus,
};

/// Recorrido completo del flujo de compra en modo demo, sin red ni base
/// de datos: agrega al carrito, crea el pedido, aprueba el pago y lo
/// lleva hasta entregado.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mercado_express=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig {
        database_url: None,
        demo: true,
        demo_dir: ".mercado_demo".into(),
        almacen_dir: ".mercado_almacen".into(),
        jwt_secret: "demo-secret".into(),
        timeout_pedido: std::time::Duration::from_millis(18_000),
        timeout_detalles: std::time::Duration::from_millis(10_000),
    };
    let toasts = ToastBus::new();
    let store = pedidos::crear_store(&config, None, toasts.clone())?;

    let vendedor_id = Uuid::new_v4();
    let comprador = perfil_demo("Carla", "Quispe");
    let charango = producto_demo("Charango artesanal", 45_000, 3, vendedor_id);
    let aguayo = producto_demo("Aguayo tradicional", 12_000, 10, vendedor_id);

    let mut carrito = Carrito::new(toasts.clone());
    carrito.agregar_item(&charango, 1);
    carrito.agregar_item(&aguayo, 2);
    tracing::info!(
        total = %formatear_bs(carrito.total()),
        unidades = carrito.cantidad(),
        "carrito listo"
    );

    let datos = DatosEnvio {
        direccion: "Av. 6 de Agosto 123, La Paz".to_string(),
        telefono: "70000000".to_string(),
        notas: Some("Entregar por la tarde".to_string()),
    };
    let pedido = carrito
        .crear_pedido_desde_carrito(store.as_ref(), Some(&comprador), datos)
        .await
        .ok_or_else(|| anyhow::anyhow!("la creación del pedido falló"))?;
    tracing::info!(
        numero = %pedido.numero_pedido,
        total = %formatear_bs(pedido.total),
        "pedido creado; el carrito quedó vacío: {}",
        carrito.esta_vacio()
    );

    let mut vista = pedidos::VistaPedidos::de_vendedor(store.clone(), vendedor_id);
    vista.cargar().await;
    tracing::info!(ventas = vista.pedidos().len(), "ventas del vendedor");

    let objetos = almacen::crear_almacen(&config);
    let comprobante = objetos
        .subir(
            BUCKET_COMPROBANTES,
            &format!("{}/recibo.jpg", pedido.id),
            b"recibo-qr-demo",
        )
        .await?;
    vista.adjuntar_comprobante(pedido.id, &comprobante).await?;
    vista
        .aprobar_pago(pedido.id)
        .await?;

    for estado in [
        EstadoPedido::Procesando,
        EstadoPedido::Enviado,
        EstadoPedido::Entregado,
    ] {
        let actualizado = vista
            .cambiar_estado(pedido.id, estado)
            .await?;
        tracing::info!(
            estado = actualizado.estado.nombre(),
            progreso = actualizado.estado.progreso(),
            "avance del pedido"
        );
    }

    for toast in toasts.actuales() {
        tracing::info!(nivel = ?toast.nivel, "toast pendiente: {}", toast.mensaje);
    }

    Ok(())
}

fn perfil_demo(nombres: &str, apellidos: &str) -> Perfil {
    let ahora = Utc::now();
    Perfil {
        id: Uuid::new_v4(),
        email: format!("{}@demo.mercado.bo", nombres.to_lowercase()),
        password_hash: String::new(),
        nombres: nombres.to_string(),
        apellidos: apellidos.to_string(),
        telefono: None,
        carnet: None,
        ciudad: Some("La Paz".to_string()),
        avatar_url: None,
        rol: Rol::Usuario,
        activo: true,
        descripcion_vendedor: None,
        qr_pago_url: None,
        plan: None,
        plan_expira: None,
        calificacion: None,
        created_at: ahora,
        updated_at: ahora,
    }
}

fn producto_demo(nombre: &str, precio: i64, stock: i32, vendedor_id: Uuid) -> Producto {
    let ahora = Utc::now();
    Producto {
        id: Uuid::new_v4(),
        nombre: nombre.to_string(),
        precio,
        descripcion: None,
        imagen_url: None,
        imagenes_adicionales: Vec::new(),
        categoria_id: None,
        condicion: Condicion::Nuevo,
        stock,
        activo: true,
        destacado: false,
        vendedor_id: Some(vendedor_id),
        created_at: ahora,
        updated_at: ahora,
    }
}
