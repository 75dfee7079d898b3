//! Núcleo de Mercado Express: marketplace C2C boliviano.
//!
//! Carrito de compras, creación y seguimiento de pedidos con pago por
//! QR, resolutor de permisos por rol, sesión autenticada y bus de
//! notificaciones. La persistencia de pedidos es intercambiable:
//! Postgres en producción, archivo JSON en modo demo.

pub mod almacen;
pub mod auditoria;
pub mod carrito;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pedidos;
pub mod permisos;
pub mod productos;
pub mod sesion;
pub mod toast;
