pub mod compression;
pub mod core;
pub mod table;
pub mod values;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                        DOCVALUES STRUCT ARCHITECTURE                      │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── VALUE LAYER ─────────────────────────────┐
│                                                                           │
│  ┌────────────────────────────────────────────────────────────────────┐  │
│  │                        struct ValueManager                          │  │
│  │  ┌──────────────────────────────────────────────────────────────┐  │  │
│  │  │ postlist: Arc<dyn Table>       // Chunks + per-slot stats    │  │  │
│  │  │ termlist: Arc<dyn Table>       // Per-doc slots-used records │  │  │
│  │  │ changes: BTreeMap<SlotNo, BTreeMap<DocId, Vec<u8>>>          │  │  │
│  │  │ slots: BTreeMap<DocId, Vec<u8>>  // Staged slots-used        │  │  │
│  │  │ cursor: Mutex<Option<TableCursor>> // Memoized read cursor   │  │  │
│  │  │ stats_cache: StatsCache        // MRU per-slot statistics    │  │  │
│  │  └──────────────────────────────────────────────────────────────┘  │  │
│  └────────────────────────────────────────────────────────────────────┘  │
│                                                                           │
│  ┌──────────────────────┐  ┌───────────────────┐  ┌───────────────────┐  │
│  │ struct ValueUpdater  │  │ struct            │  │ struct            │  │
│  │ • per-slot merge     │  │ ValueChunkReader  │  │ SlotValueList     │  │
│  │ • rechunk + rekey    │  │ • delta stream    │  │ • cross-chunk     │  │
│  │ • split at threshold │  │ • skip_to         │  │   iteration       │  │
│  └──────────────────────┘  └───────────────────┘  └───────────────────┘  │
│                                                                           │
│  ┌──────────────────────┐  ┌───────────────────┐  ┌───────────────────┐  │
│  │ struct ValueStats    │  │ struct StatsCache │  │ slots-used codec  │  │
│  │ • freq/lower/upper   │  │ • LruCache(1)     │  │ • bitmap or       │  │
│  └──────────────────────┘  │ • hit/miss counts │  │   interpolative   │  │
│                            └───────────────────┘  └───────────────────┘  │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── TABLE LAYER ─────────────────────────────┐
│                                                                           │
│  ┌──────────────────────┐  ┌───────────────────┐  ┌───────────────────┐  │
│  │ trait Table          │  │ struct TableCursor│  │ struct MemTable   │  │
│  │ • get_exact          │  │ • find_entry      │  │ • BTreeMap +      │  │
│  │ • floor/next/first   │  │   (floor + exact) │  │   RwLock          │  │
│  │ • add / del          │  │ • next            │  │ • close()         │  │
│  └──────────────────────┘  └───────────────────┘  └───────────────────┘  │
└───────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── ENCODING LAYER ────────────────────────────┐
│                                                                           │
│  ┌──────────────────────┐  ┌────────────────────────────────────────┐    │
│  │ struct PackCodec     │  │ struct BitWriter / BitReader           │    │
│  │ • varint             │  │ • centered minimal binary codes        │    │
│  │ • length-prefixed    │  │ • interpolative encode / streaming     │    │
│  │ • sort-preserving    │  │   decode                               │    │
│  └──────────────────────┘  └────────────────────────────────────────┘    │
└───────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── RELATIONSHIPS ─────────────────────────────┐
│                                                                           │
│  ValueManager ──stages──> changes/slots ──merge_changes──> ValueUpdater  │
│       │                                                        │          │
│       ├──reads──> TableCursor ──locates──> chunk ──> ValueChunkReader    │
│       │                                                                   │
│       ├──caches──> StatsCache ──snapshots──> CacheStats                  │
│       │                                                                   │
│       └──encodes──> slots-used record ──decode──> delete/get_all_values  │
│                                                                           │
│  ValueUpdater ──writes──> Table (chunk keys via PackCodec sort order)    │
│                                                                           │
└───────────────────────────────────────────────────────────────────────────┘
*/
