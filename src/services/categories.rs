use crate::{
    entities::{category, product, Category, CategoryModel, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use futures::future::BoxFuture;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Slug of the sentinel category that receives orphaned products. The row is
/// created lazily the first time a product has to be reassigned.
pub const UNCATEGORIZED_SLUG: &str = "sem-categoria";
const UNCATEGORIZED_NAME: &str = "Sem Categoria";
const UNCATEGORIZED_DESCRIPTION: &str = "Default category for products without a defined category";

/// The category tree holds at most three levels: roots plus two nested levels.
pub const MAX_CATEGORY_LEVELS: usize = 3;

/// Upper bound on parent-chain walks. Bounds query cost even on data that
/// somehow violates the depth invariant.
const MAX_PARENT_WALK: usize = 3;

/// `get_hierarchy` nests up to this many child levels under each root.
const HIERARCHY_CHILD_LEVELS: usize = 3;

/// Service maintaining the category tree: structural invariants (acyclic,
/// depth-bounded) and product/category consistency on deactivation and
/// removal. Cascades run inside a single database transaction so an
/// interrupted cascade leaves no intermediate state behind.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    /// `None` leaves the parent untouched; `Some(None)` detaches the
    /// category from its parent, making it a root.
    pub parent_id: Option<Option<Uuid>>,
    pub active: Option<bool>,
}

/// Category together with its direct associations
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithRelations {
    pub category: CategoryModel,
    pub parent: Option<CategoryModel>,
    pub children: Vec<CategoryModel>,
    pub product_count: Option<u64>,
}

/// Node of the active-category tree returned by `get_hierarchy`
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    pub category: CategoryModel,
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new category
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryWithRelations, ServiceError> {
        let db = &*self.db;

        if Category::find()
            .filter(category::Column::Slug.eq(&input.slug))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("Slug already exists".to_string()));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = Category::find_by_id(parent_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Parent category not found".to_string()))?;

            if !parent.active {
                return Err(ServiceError::ValidationError(
                    "Cannot associate with an inactive parent category".to_string(),
                ));
            }

            let parent_depth = Self::category_depth(db, parent_id).await?;
            if parent_depth + 1 >= MAX_CATEGORY_LEVELS {
                return Err(ServiceError::ValidationError(
                    "Maximum category depth (3 levels) exceeded".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            slug: Set(input.slug),
            parent_id: Set(input.parent_id),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let category = category.insert(db).await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(category.id))
            .await;

        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Self::with_relations(db, category, false).await
    }

    /// List categories ordered by name, optionally including inactive ones.
    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithRelations>, ServiceError> {
        let db = &*self.db;

        let all = Category::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        let by_id: HashMap<Uuid, CategoryModel> =
            all.iter().map(|c| (c.id, c.clone())).collect();
        let mut children_of: HashMap<Uuid, Vec<CategoryModel>> = HashMap::new();
        for c in &all {
            if let Some(parent_id) = c.parent_id {
                children_of.entry(parent_id).or_default().push(c.clone());
            }
        }

        Ok(all
            .into_iter()
            .filter(|c| include_inactive || c.active)
            .map(|c| {
                let parent = c.parent_id.and_then(|pid| by_id.get(&pid).cloned());
                let children = children_of.get(&c.id).cloned().unwrap_or_default();
                CategoryWithRelations {
                    category: c,
                    parent,
                    children,
                    product_count: None,
                }
            })
            .collect())
    }

    /// Get a single category with parent, children and product count
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<CategoryWithRelations, ServiceError> {
        let db = &*self.db;

        let category = Category::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))?;

        Self::with_relations(db, category, true).await
    }

    /// Update a category. A `true -> false` transition of `active` cascades:
    /// every product under the category or any descendant is reassigned to
    /// the Uncategorized sentinel and every descendant is deactivated, all
    /// inside one transaction, before the category's own flag is persisted.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryWithRelations, ServiceError> {
        let db = &*self.db;

        let current = Category::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))?;

        if let Some(ref slug) = input.slug {
            if *slug != current.slug
                && Category::find()
                    .filter(category::Column::Slug.eq(slug))
                    .one(db)
                    .await?
                    .is_some()
            {
                return Err(ServiceError::Conflict("Slug already exists".to_string()));
            }
        }

        if let Some(new_parent) = input.parent_id {
            if new_parent != current.parent_id {
                if new_parent == Some(id) {
                    return Err(ServiceError::ValidationError(
                        "Category cannot be its own parent".to_string(),
                    ));
                }

                if let Some(parent_id) = new_parent {
                    Category::find_by_id(parent_id).one(db).await?.ok_or_else(|| {
                        ServiceError::NotFound("Parent category not found".to_string())
                    })?;

                    if Self::is_circular(db, id, parent_id).await? {
                        return Err(ServiceError::ValidationError(
                            "Circular reference detected".to_string(),
                        ));
                    }

                    let parent_depth = Self::category_depth(db, parent_id).await?;
                    if parent_depth + 1 >= MAX_CATEGORY_LEVELS {
                        return Err(ServiceError::ValidationError(
                            "Maximum category depth (3 levels) exceeded".to_string(),
                        ));
                    }
                }
            }
        }

        // Deactivating an already-inactive category is a no-op, not an error.
        let deactivating = input.active == Some(false) && current.active;

        if input.active == Some(true) {
            if let Some(parent_id) = current.parent_id {
                let parent = Category::find_by_id(parent_id).one(db).await?;
                if matches!(parent, Some(ref p) if !p.active) {
                    return Err(ServiceError::ValidationError(
                        "Cannot activate a category whose parent is inactive".to_string(),
                    ));
                }
            }
        }

        let txn = db.begin().await?;
        let mut moved_products: u64 = 0;
        let mut sentinel_id: Option<Uuid> = None;

        if deactivating {
            // Products of the whole subtree move to the sentinel before any
            // active flag changes; descendants are flagged before the
            // triggering category itself.
            let levels = Self::descendants_by_level(&txn, id).await?;
            let descendants: Vec<Uuid> = levels.iter().flatten().copied().collect();

            let mut affected = vec![id];
            affected.extend(descendants.iter().copied());

            let product_count = Product::find()
                .filter(product::Column::CategoryId.is_in(affected.clone()))
                .count(&txn)
                .await?;

            if product_count > 0 {
                let uncategorized = Self::get_or_create_uncategorized(&txn).await?;
                moved_products =
                    Self::reassign_products(&txn, &affected, uncategorized.id).await?;
                sentinel_id = Some(uncategorized.id);
            }

            if !descendants.is_empty() {
                Category::update_many()
                    .col_expr(category::Column::Active, Expr::value(false))
                    .col_expr(category::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(category::Column::Id.is_in(descendants))
                    .exec(&txn)
                    .await?;
            }
        }

        let mut active_model: category::ActiveModel = current.into();
        if let Some(name) = input.name {
            active_model.name = Set(name);
        }
        if let Some(description) = input.description {
            active_model.description = Set(Some(description));
        }
        if let Some(slug) = input.slug {
            active_model.slug = Set(slug);
        }
        if let Some(parent_id) = input.parent_id {
            active_model.parent_id = Set(parent_id);
        }
        if let Some(active) = input.active {
            active_model.active = Set(active);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model.update(&txn).await?;
        txn.commit().await?;

        if let Some(target) = sentinel_id {
            if moved_products > 0 {
                self.event_sender
                    .send_or_log(Event::ProductsReassigned {
                        target_category_id: target,
                        count: moved_products,
                    })
                    .await;
            }
        }
        if deactivating {
            self.event_sender
                .send_or_log(Event::CategoryDeactivated(id))
                .await;
        } else {
            self.event_sender
                .send_or_log(Event::CategoryUpdated(id))
                .await;
        }

        info!(category_id = %id, "Category updated");
        Self::with_relations(db, updated, false).await
    }

    /// Remove a category and its whole subtree. Products under the category
    /// or any descendant are reassigned to the Uncategorized sentinel first;
    /// descendant rows are then deleted bottom-up, the category row last.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;

        Category::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))?;

        let txn = db.begin().await?;

        let levels = Self::descendants_by_level(&txn, id).await?;
        let mut affected = vec![id];
        affected.extend(levels.iter().flatten().copied());

        let product_count = Product::find()
            .filter(product::Column::CategoryId.is_in(affected.clone()))
            .count(&txn)
            .await?;

        let mut moved_products: u64 = 0;
        let mut sentinel_id: Option<Uuid> = None;
        if product_count > 0 {
            let uncategorized = Self::get_or_create_uncategorized(&txn).await?;
            moved_products = Self::reassign_products(&txn, &affected, uncategorized.id).await?;
            sentinel_id = Some(uncategorized.id);
        }

        // Deepest level first so the parent foreign key is never violated.
        for level in levels.iter().rev() {
            if !level.is_empty() {
                Category::delete_many()
                    .filter(category::Column::Id.is_in(level.clone()))
                    .exec(&txn)
                    .await?;
            }
        }

        Category::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if let Some(target) = sentinel_id {
            if moved_products > 0 {
                self.event_sender
                    .send_or_log(Event::ProductsReassigned {
                        target_category_id: target,
                        count: moved_products,
                    })
                    .await;
            }
        }
        self.event_sender
            .send_or_log(Event::CategoryDeleted(id))
            .await;

        info!(category_id = %id, "Category removed");
        Ok(())
    }

    /// Active root categories with their active children recursively
    /// populated, ordered by name at every level.
    #[instrument(skip(self))]
    pub async fn get_hierarchy(&self) -> Result<Vec<CategoryTreeNode>, ServiceError> {
        let db = &*self.db;

        let roots = Category::find()
            .filter(category::Column::ParentId.is_null())
            .filter(category::Column::Active.eq(true))
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        let mut nodes = Vec::with_capacity(roots.len());
        for root in roots {
            nodes.push(Self::build_tree(db, root, HIERARCHY_CHILD_LEVELS).await?);
        }
        Ok(nodes)
    }

    /// Number of ancestors of `id`, walking `parent_id` links upward.
    pub async fn depth(&self, id: Uuid) -> Result<usize, ServiceError> {
        Self::category_depth(&*self.db, id).await
    }

    /// Whether making `potential_parent_id` the parent of `category_id`
    /// would close a cycle.
    pub async fn check_circular(
        &self,
        category_id: Uuid,
        potential_parent_id: Uuid,
    ) -> Result<bool, ServiceError> {
        Self::is_circular(&*self.db, category_id, potential_parent_id).await
    }

    // -- internal helpers, all generic over the connection so they run both
    // -- on the pool and inside cascade transactions

    async fn with_relations<C: ConnectionTrait>(
        db: &C,
        category: CategoryModel,
        include_product_count: bool,
    ) -> Result<CategoryWithRelations, ServiceError> {
        let parent = match category.parent_id {
            Some(parent_id) => Category::find_by_id(parent_id).one(db).await?,
            None => None,
        };

        let children = Category::find()
            .filter(category::Column::ParentId.eq(category.id))
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        let product_count = if include_product_count {
            Some(
                Product::find()
                    .filter(product::Column::CategoryId.eq(category.id))
                    .count(db)
                    .await?,
            )
        } else {
            None
        };

        Ok(CategoryWithRelations {
            category,
            parent,
            children,
            product_count,
        })
    }

    /// Fetch or lazily create the sentinel category. The unique index on
    /// `slug` turns a concurrent double-create into an insert error that is
    /// resolved by re-reading.
    pub(crate) async fn get_or_create_uncategorized<C: ConnectionTrait>(
        db: &C,
    ) -> Result<CategoryModel, ServiceError> {
        if let Some(existing) = Category::find()
            .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let sentinel = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(UNCATEGORIZED_NAME.to_string()),
            description: Set(Some(UNCATEGORIZED_DESCRIPTION.to_string())),
            slug: Set(UNCATEGORIZED_SLUG.to_string()),
            parent_id: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match sentinel.insert(db).await {
            Ok(created) => {
                info!(category_id = %created.id, "Uncategorized sentinel category created");
                Ok(created)
            }
            Err(insert_err) => {
                // Lost the creation race: the row must exist now.
                Category::find()
                    .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
                    .one(db)
                    .await?
                    .ok_or(ServiceError::DatabaseError(insert_err))
            }
        }
    }

    /// Reassign every product in `category_ids` to `target`, returning the
    /// number of products moved.
    async fn reassign_products<C: ConnectionTrait>(
        db: &C,
        category_ids: &[Uuid],
        target: Uuid,
    ) -> Result<u64, ServiceError> {
        let count = Product::find()
            .filter(product::Column::CategoryId.is_in(category_ids.to_vec()))
            .count(db)
            .await?;

        if count > 0 {
            Product::update_many()
                .col_expr(product::Column::CategoryId, Expr::value(target))
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::CategoryId.is_in(category_ids.to_vec()))
                .exec(db)
                .await?;

            info!(count, target_category_id = %target, "Products moved to the Uncategorized category");
        }

        Ok(count)
    }

    /// Transitive descendant ids of `root`, grouped level by level
    /// (children first, then grandchildren, ...).
    async fn descendants_by_level<C: ConnectionTrait>(
        db: &C,
        root: Uuid,
    ) -> Result<Vec<Vec<Uuid>>, ServiceError> {
        let mut levels: Vec<Vec<Uuid>> = Vec::new();
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            let children: Vec<Uuid> = Category::find()
                .filter(category::Column::ParentId.is_in(frontier))
                .all(db)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();

            if children.is_empty() {
                break;
            }
            frontier = children.clone();
            levels.push(children);
        }

        Ok(levels)
    }

    /// Upward walk over `parent_id`, capped at [`MAX_PARENT_WALK`] steps.
    async fn category_depth<C: ConnectionTrait>(
        db: &C,
        category_id: Uuid,
    ) -> Result<usize, ServiceError> {
        let mut depth = 0;
        let mut current = category_id;

        while depth < MAX_PARENT_WALK {
            let parent_id = Category::find_by_id(current)
                .one(db)
                .await?
                .and_then(|c| c.parent_id);

            match parent_id {
                Some(parent_id) => {
                    depth += 1;
                    current = parent_id;
                }
                None => break,
            }
        }

        Ok(depth)
    }

    /// Walks upward from `potential_parent_id`; true if `category_id` is
    /// reached before the root. Iterative and step-bounded.
    async fn is_circular<C: ConnectionTrait>(
        db: &C,
        category_id: Uuid,
        potential_parent_id: Uuid,
    ) -> Result<bool, ServiceError> {
        if category_id == potential_parent_id {
            return Ok(true);
        }

        let mut current = potential_parent_id;
        for _ in 0..MAX_PARENT_WALK {
            let parent_id = Category::find_by_id(current)
                .one(db)
                .await?
                .and_then(|c| c.parent_id);

            match parent_id {
                Some(parent_id) if parent_id == category_id => return Ok(true),
                Some(parent_id) => current = parent_id,
                None => return Ok(false),
            }
        }

        Ok(false)
    }

    fn build_tree<C: ConnectionTrait>(
        db: &C,
        node: CategoryModel,
        levels: usize,
    ) -> BoxFuture<'_, Result<CategoryTreeNode, ServiceError>> {
        Box::pin(async move {
            let mut children = Vec::new();

            if levels > 0 {
                let rows = Category::find()
                    .filter(category::Column::ParentId.eq(node.id))
                    .filter(category::Column::Active.eq(true))
                    .order_by_asc(category::Column::Name)
                    .all(db)
                    .await?;

                for row in rows {
                    children.push(Self::build_tree(db, row, levels - 1).await?);
                }
            }

            Ok(CategoryTreeNode {
                category: node,
                children,
            })
        })
    }
}
