use crate::backend::database::DataSourceProvider;
use crate::config::{AppConfig, RealmConfig};
use crate::error::{AppError, AppResult};
use crate::query::QueryTemplateSet;
use crate::repository::UserRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

/// A configured realm: its pool plus its compiled, immutable query set
pub struct ProviderInstance {
    realm: RealmConfig,
    data_source: Arc<DataSourceProvider>,
    queries: Arc<QueryTemplateSet>,
}

impl ProviderInstance {
    pub fn realm(&self) -> &RealmConfig {
        &self.realm
    }

    pub fn data_source(&self) -> &Arc<DataSourceProvider> {
        &self.data_source
    }

    pub fn queries(&self) -> &Arc<QueryTemplateSet> {
        &self.queries
    }

    pub fn repository(&self) -> UserRepository {
        UserRepository::new(self.data_source.clone(), self.queries.clone())
    }
}

type InstanceSlot = Arc<OnceCell<Arc<ProviderInstance>>>;

/// Realm id to provider instance, configured lazily
///
/// Each realm has its own slot. Configuring one realm never holds the map
/// lock, so lookups of other realms do not wait on its connection attempt.
pub struct ProviderRegistry {
    realms: RwLock<HashMap<String, RealmConfig>>,
    instances: RwLock<HashMap<String, InstanceSlot>>,
}

impl ProviderRegistry {
    pub fn new(config: &AppConfig) -> Self {
        let realms = config
            .realms
            .iter()
            .map(|realm| (realm.id.clone(), realm.clone()))
            .collect();
        Self {
            realms: RwLock::new(realms),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Compile the realm's queries and open a tested pool for it
    pub async fn configure(realm: &RealmConfig) -> AppResult<ProviderInstance> {
        let queries = realm.query_templates()?;
        let data_source = DataSourceProvider::new();
        data_source
            .configure(realm.display_name(), &realm.backend_config())
            .await?;

        Ok(ProviderInstance {
            realm: realm.clone(),
            data_source: Arc::new(data_source),
            queries: Arc::new(queries),
        })
    }

    pub async fn get_or_configure(&self, realm_id: &str) -> AppResult<Arc<ProviderInstance>> {
        let slot = self.slot(realm_id).await?;
        let instance = slot
            .get_or_try_init(|| async {
                let realm = self
                    .realms
                    .read()
                    .await
                    .get(realm_id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound(format!("Unknown realm: {}", realm_id)))?;
                let instance = Self::configure(&realm).await?;
                info!(realm = %realm_id, "Realm configured");
                Ok::<_, AppError>(Arc::new(instance))
            })
            .await?;
        Ok(instance.clone())
    }

    async fn slot(&self, realm_id: &str) -> AppResult<InstanceSlot> {
        if let Some(slot) = self.instances.read().await.get(realm_id) {
            return Ok(slot.clone());
        }
        if !self.realms.read().await.contains_key(realm_id) {
            return Err(AppError::NotFound(format!("Unknown realm: {}", realm_id)));
        }
        Ok(self
            .instances
            .write()
            .await
            .entry(realm_id.to_string())
            .or_default()
            .clone())
    }

    /// Configure `realm` afresh and replace any running instance
    ///
    /// The replaced pool is closed in the background.
    pub async fn validate_configuration(&self, realm: RealmConfig) -> AppResult<Arc<ProviderInstance>> {
        realm.validate()?;
        let instance = Arc::new(Self::configure(&realm).await?);

        self.realms
            .write()
            .await
            .insert(realm.id.clone(), realm.clone());
        let previous = self.instances.write().await.insert(
            realm.id.clone(),
            Arc::new(OnceCell::new_with(Some(instance.clone()))),
        );

        if let Some(previous) = previous.as_ref().and_then(|slot| slot.get()).cloned() {
            let realm_id = realm.id.clone();
            tokio::spawn(async move {
                previous.data_source.close().await;
                info!(realm = %realm_id, "Previous realm configuration closed");
            });
        }

        info!(realm = %realm.id, "Realm reconfigured");
        Ok(instance)
    }

    pub async fn repository(&self, realm_id: &str) -> AppResult<UserRepository> {
        Ok(self.get_or_configure(realm_id).await?.repository())
    }

    pub async fn realm_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.realms.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn close(&self) {
        let slots: Vec<_> = self.instances.write().await.drain().collect();
        for (realm_id, slot) in slots {
            let Some(instance) = slot.get() else {
                continue;
            };
            instance.data_source.close().await;
            info!(realm = %realm_id, "Realm closed");
        }
    }
}
