use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
};

/// Buckets conocidos. `comprobantes` es privado y se sirve con URLs
/// firmadas; los demás son públicos.
pub const BUCKET_COMPROBANTES: &str = "comprobantes";
pub const BUCKET_PRODUCTOS: &str = "productos";
pub const BUCKET_QR_VENDEDORES: &str = "qr-vendedores";

/// Frontera con el almacenamiento de objetos: subida, URLs y borrado
/// por ruta dentro de un bucket.
#[async_trait]
pub trait Almacen: Send + Sync {
    async fn subir(&self, bucket: &str, ruta: &str, bytes: &[u8]) -> AppResult<String>;

    fn url_publica(&self, bucket: &str, ruta: &str) -> String;

    async fn url_firmada(&self, bucket: &str, ruta: &str, vigencia: Duration)
    -> AppResult<String>;

    async fn eliminar(&self, bucket: &str, ruta: &str) -> AppResult<()>;
}

/// Construye el almacén de objetos según la configuración.
pub fn crear_almacen(config: &AppConfig) -> Arc<dyn Almacen> {
    Arc::new(AlmacenLocal::new(config.almacen_dir.clone()))
}

/// Implementación sobre el sistema de archivos, usada por el modo demo
/// y las pruebas.
pub struct AlmacenLocal {
    base: PathBuf,
}

impl AlmacenLocal {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn ruta_de(&self, bucket: &str, ruta: &str) -> PathBuf {
        self.base.join(bucket).join(ruta)
    }
}

#[async_trait]
impl Almacen for AlmacenLocal {
    async fn subir(&self, bucket: &str, ruta: &str, bytes: &[u8]) -> AppResult<String> {
        let destino = self.ruta_de(bucket, ruta);
        if let Some(dir) = destino.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
        }
        tokio::fs::write(&destino, bytes)
            .await
            .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
        Ok(format!("{bucket}/{ruta}"))
    }

    fn url_publica(&self, bucket: &str, ruta: &str) -> String {
        format!("file://{}", self.ruta_de(bucket, ruta).display())
    }

    async fn url_firmada(
        &self,
        bucket: &str,
        ruta: &str,
        vigencia: Duration,
    ) -> AppResult<String> {
        let destino = self.ruta_de(bucket, ruta);
        if !tokio::fs::try_exists(&destino)
            .await
            .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?
        {
            return Err(AppError::NoEncontrado);
        }
        let expira = Utc::now() + chrono::Duration::from_std(vigencia).unwrap_or_default();
        Ok(format!(
            "file://{}?expira={}",
            destino.display(),
            expira.timestamp()
        ))
    }

    async fn eliminar(&self, bucket: &str, ruta: &str) -> AppResult<()> {
        match tokio::fs::remove_file(self.ruta_de(bucket, ruta)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NoEncontrado)
            }
            Err(err) => Err(AppError::Interno(anyhow::anyhow!(err))),
        }
    }
}
