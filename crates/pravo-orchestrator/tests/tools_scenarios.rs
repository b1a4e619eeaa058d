//! End-to-end tool scenarios over in-memory stores and deterministic fakes.

use async_trait::async_trait;
use pravo_core::{Document, DocumentType, Result, Section, SectionType};
use pravo_ingest::{
    DecisionFetcher, DecisionSearch, IngestWorker, ScrapeRequest, ScrapeWorker, Sectionizer,
};
use pravo_legislation::{ActSource, LegislationService};
use pravo_llm::testing::{FakeChatModel, FakeEmbedder, FakeProviderFactory};
use pravo_llm::{CostMeter, EmbeddingGateway};
use pravo_orchestrator::{Orchestrator, ToolContext};
use pravo_patterns::PatternStore;
use pravo_sources::{DecisionText, FetchedAct, SearchPage, UploadParser};
use pravo_store::{
    ChunkPayload, MemoryMetaStore, MemoryVectorStore, MetaStore, VectorPoint, VectorStore,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DIM: usize = 8;

struct FakeCourt;

#[async_trait]
impl DecisionFetcher for FakeCourt {
    async fn fetch_decision(&self, doc_id: &str) -> Result<DecisionText> {
        Ok(DecisionText {
            text: format!(
                "встановлено обставини справи {0}\n\nсуд вважає вимоги обґрунтованими {0}\n\nухвалив позов задовольнити {0}",
                "додаткові відомості у справі наведено повно ".repeat(4)
            ),
            html: None,
            case_number: Some(format!("756/{doc_id}/24")),
        })
    }
}

#[async_trait]
impl DecisionSearch for FakeCourt {
    async fn search_page(&self, _request: &ScrapeRequest, _page: usize) -> Result<SearchPage> {
        Ok(SearchPage {
            items: Vec::new(),
            total: Some(0),
            page: Some(1),
        })
    }
}

struct FakeActs;

#[async_trait]
impl ActSource for FakeActs {
    async fn fetch_act(&self, act_id: &str) -> Result<FetchedAct> {
        let act = pravo_core::LegislationAct::new(
            act_id,
            pravo_core::ActType::Code,
            "Цивільний кодекс України",
        );
        let articles = vec![pravo_core::LegislationArticle::new(
            act_id,
            "625",
            "Боржник не звільняється від відповідальності за неможливість виконання ним грошового зобов'язання.",
        )];
        Ok(FetchedAct { act, articles })
    }
}

struct Harness {
    orchestrator: Orchestrator,
    meta: Arc<MemoryMetaStore>,
    vectors: Arc<MemoryVectorStore>,
    chat: Arc<FakeChatModel>,
    embedder: Arc<FakeEmbedder>,
}

fn harness() -> Harness {
    let meta: Arc<MemoryMetaStore> = Arc::new(MemoryMetaStore::new());
    let vectors: Arc<MemoryVectorStore> = Arc::new(MemoryVectorStore::new(DIM));
    let meter = Arc::new(CostMeter::new());
    let factory = Arc::new(FakeProviderFactory::new(DIM));
    let chat = factory.chat.clone();
    let embedder = factory.embedder.clone();
    let gateway = Arc::new(EmbeddingGateway::new(embedder.clone(), meter.clone()));

    let legislation = Arc::new(LegislationService::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(FakeActs),
    ));
    let patterns = Arc::new(PatternStore::new(meta.clone(), gateway.clone()));
    let ingest = Arc::new(IngestWorker::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(FakeCourt),
        Sectionizer::new(),
        4,
    ));
    let scraper = Arc::new(ScrapeWorker::new(Arc::new(FakeCourt), ingest.clone()));

    let ctx = ToolContext::new(
        meta.clone(),
        vectors.clone(),
        gateway,
        factory,
        legislation,
        patterns,
        ingest,
        scraper,
        Arc::new(UploadParser::new()),
        meter,
    );
    Harness {
        orchestrator: Orchestrator::new(ctx),
        meta,
        vectors,
        chat,
        embedder,
    }
}

async fn seed_decision(h: &Harness, reasoning: &str) -> Uuid {
    let doc = Document::new("77700011", DocumentType::CourtDecision)
        .with_title("Постанова КЦС ВС")
        .with_case_number("756/4321/23")
        .with_court("Верховний Суд");
    let stored = h.meta.upsert_document(&doc).await.unwrap();

    let reasoning_full = format!("суд вважає {reasoning}");
    let decision_full = "ухвалив позов задовольнити повністю з наведених мотивів".to_string();
    let full = format!("{reasoning_full}\n\n{decision_full}");
    let mut update = stored.clone();
    update.full_text = Some(full.clone());
    h.meta.upsert_document(&update).await.unwrap();

    let boundary = reasoning_full.len();
    let sections = vec![
        Section::new(stored.id, SectionType::CourtReasoning, &full, 0, boundary, 0.9).unwrap(),
        Section::new(stored.id, SectionType::Decision, &full, boundary + 2, full.len(), 0.9)
            .unwrap(),
    ];
    h.meta.replace_sections(stored.id, &sections).await.unwrap();

    let embedding = h.embedder.deterministic(&reasoning_full);
    h.vectors
        .upsert(vec![VectorPoint {
            id: Uuid::new_v4(),
            vector: embedding.vector,
            payload: ChunkPayload {
                doc_id: stored.id,
                document_type: "court_decision".into(),
                section_type: SectionType::CourtReasoning,
                text: reasoning_full.clone(),
                date: None,
                court: Some("Верховний Суд".into()),
                chamber: Some("КЦС".into()),
                case_number: Some("756/4321/23".into()),
                dispute_category: None,
                outcome: None,
                deviation_flag: false,
                precedent_status: Some("active".into()),
                law_articles: Vec::new(),
                matter_id: None,
            },
        }])
        .await
        .unwrap();
    stored.id
}

#[tokio::test]
async fn test_s1_procedural_deadline() {
    let h = harness();
    let output = h
        .orchestrator
        .call(
            "calculate_procedural_deadlines",
            json!({
                "procedure_code": "cpc",
                "appeal_type": "appeal",
                "event_type": "decision",
                "event_date": "2024-01-15"
            }),
        )
        .await
        .unwrap();

    assert_eq!(output.payload["days"], 30);
    assert_eq!(output.payload["variants"][0]["rule"], "from_event_date");
    assert_eq!(output.payload["variants"][0]["start_date"], "2024-01-15");
    assert_eq!(output.payload["variants"][0]["end_date"], "2024-02-14");
    assert_eq!(
        output.payload["norms"]["act"],
        "Цивільний процесуальний кодекс України"
    );
}

#[tokio::test]
async fn test_deadline_with_receipt_date_diverges() {
    let h = harness();
    let output = h
        .orchestrator
        .call(
            "calculate_procedural_deadlines",
            json!({
                "procedure_code": "cpc",
                "appeal_type": "appeal",
                "event_type": "decision",
                "event_date": "2024-01-15",
                "receipt_date": "2024-01-22"
            }),
        )
        .await
        .unwrap();

    let variants = output.payload["variants"].as_array().unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[1]["rule"], "from_receipt_date");
    assert_eq!(variants[1]["start_date"], "2024-01-22");
    assert_eq!(variants[1]["end_date"], "2024-02-21");
    assert_ne!(variants[0]["end_date"], variants[1]["end_date"]);
}

#[tokio::test]
async fn test_s2_intent_classification() {
    let h = harness();
    let output = h
        .orchestrator
        .call(
            "classify_intent",
            json!({"query": "Хочу оскаржити рішення суду першої інстанції"}),
        )
        .await
        .unwrap();

    let intent = output.payload["intent"].as_str().unwrap();
    assert!(["appeal", "procedural_deadlines"].contains(&intent));
    assert!(["quick", "standard", "deep"]
        .contains(&output.payload["reasoning_budget"].as_str().unwrap()));
    assert!(output.payload["slots"]["procedure_code"].is_string());
}

#[tokio::test]
async fn test_s3_citation_validation_strips_and_rejects() {
    let h = harness();
    let doc_id =
        seed_decision(&h, "позовна давність за цією вимогою становить три роки згідно закону").await;

    // One grounded quote, one fabricated: the fabricated one is stripped
    // and reported, the answer survives.
    h.chat.push_response(json!({
        "short_conclusion": {"conclusion": "Строк позовної давності — три роки."},
        "legal_framework": {"norms": []},
        "practice": [{
            "source_doc_id": doc_id.to_string(),
            "section_type": "COURT_REASONING",
            "quote": "вигадана цитата, якої немає в жодному рішенні",
            "relevance_reason": "нібито релевантно"
        }],
        "sources": [{
            "document_id": doc_id.to_string(),
            "section_type": "COURT_REASONING",
            "quote": "позовна давність за цією вимогою становить три роки"
        }]
    }));

    let output = h
        .orchestrator
        .call(
            "get_legal_advice",
            json!({"query": "Яка позовна давність щодо стягнення заборгованості?"}),
        )
        .await
        .unwrap();

    let pack = &output.payload["packaged_answer"];
    assert_eq!(pack["sources"].as_array().unwrap().len(), 1);
    assert!(pack["practice"].as_array().unwrap().is_empty());
    assert!(output
        .warnings
        .iter()
        .any(|w| w.contains("not grounded")));

    // A wholly ungrounded answer is rejected outright.
    h.chat.push_response(json!({
        "short_conclusion": {"conclusion": "..."},
        "legal_framework": {"norms": []},
        "sources": [{
            "document_id": doc_id.to_string(),
            "section_type": "COURT_REASONING",
            "quote": "цілком вигадана цитата"
        }]
    }));
    let err = h
        .orchestrator
        .call(
            "get_legal_advice",
            json!({"query": "Яка позовна давність щодо стягнення заборгованості?"}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PRECONDITION_FAILED");
}

#[tokio::test]
async fn test_s4_reference_resolver() {
    let h = harness();
    let output = h
        .orchestrator
        .call("parse_reference", json!({"phrase": "ст. 625 ЦК"}))
        .await
        .unwrap();
    assert_eq!(output.payload["act_id"], "435-15");
    assert_eq!(output.payload["article_number"], "625");
}

#[tokio::test]
async fn test_s5_sectionizer_via_tool() {
    let h = harness();
    let filler = "обставини викладено послідовно і повно у тексті рішення ".repeat(3);
    let text = format!(
        "встановлено {filler}\n\nпозивач просить {filler}\n\nсуд вважає {filler}\n\nухвалив {filler}"
    );
    let output = h
        .orchestrator
        .call("extract_sections", json!({"text": text}))
        .await
        .unwrap();

    let sections = output.payload["sections"].as_array().unwrap();
    let types: Vec<&str> = sections
        .iter()
        .map(|s| s["section_type"].as_str().unwrap())
        .collect();
    for expected in ["FACTS", "CLAIMS", "COURT_REASONING", "DECISION"] {
        assert!(types.contains(&expected), "missing {expected} in {types:?}");
    }
    for section in sections {
        // f32 confidences arrive as their nearest f64.
        assert!(section["confidence"].as_f64().unwrap() >= 0.699);
    }
}

#[tokio::test]
async fn test_s6_pattern_extraction_via_tool() {
    let h = harness();
    let mut case_ids = Vec::new();
    for n in 0..12 {
        let doc = Document::new(format!("pat-{n}"), DocumentType::CourtDecision);
        let stored = h.meta.upsert_document(&doc).await.unwrap();

        let article = if n < 5 { "із застосуванням ст. 15 " } else { "" };
        let reasoning = format!(
            "суд вважає {article}доводи сторін такими, що підлягають оцінці в сукупності доказів"
        );
        let decision = if n < 8 {
            "ухвалив позов задовольнити"
        } else if n < 10 {
            "ухвалив позов задовольнити частково"
        } else {
            "ухвалив відмовити у задоволенні позову"
        };
        let full = format!("{reasoning}\n\n{decision}");
        let sections = vec![
            Section::new(
                stored.id,
                SectionType::CourtReasoning,
                &full,
                0,
                reasoning.len(),
                0.9,
            )
            .unwrap(),
            Section::new(
                stored.id,
                SectionType::Decision,
                &full,
                reasoning.len() + 2,
                full.len(),
                0.9,
            )
            .unwrap(),
        ];
        h.meta.replace_sections(stored.id, &sections).await.unwrap();
        case_ids.push(stored.id);
    }

    let output = h
        .orchestrator
        .call(
            "extract_legal_pattern",
            json!({
                "case_ids": case_ids,
                "intent": "consumer_protection"
            }),
        )
        .await
        .unwrap();

    assert_eq!(output.payload["decision_outcome"], "consumer_won");
    assert!(output.payload["law_articles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a == "ст. 15"));
    assert!((output.payload["confidence"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(output.payload["frequency"], 12);
}

#[tokio::test]
async fn test_unknown_tool_is_invalid_argument() {
    let h = harness();
    let err = h
        .orchestrator
        .call("nonexistent_tool", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_empty_query_is_invalid_argument() {
    let h = harness();
    let err = h
        .orchestrator
        .call("search_precedents", json!({"query": "   "}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_malformed_arguments_are_invalid() {
    let h = harness();
    let err = h
        .orchestrator
        .call("get_article", json!({"act": 17}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_unachievable_deadline_is_deadline_exceeded() {
    let meta: Arc<MemoryMetaStore> = Arc::new(MemoryMetaStore::new());
    let vectors: Arc<MemoryVectorStore> = Arc::new(MemoryVectorStore::new(DIM));
    let meter = Arc::new(CostMeter::new());
    let factory = Arc::new(FakeProviderFactory::new(DIM));
    factory.chat.set_delay(Duration::from_millis(250));
    factory.chat.push_response(json!("підсумок"));
    let gateway = Arc::new(EmbeddingGateway::new(factory.embedder.clone(), meter.clone()));
    let legislation = Arc::new(LegislationService::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(FakeActs),
    ));
    let patterns = Arc::new(PatternStore::new(meta.clone(), gateway.clone()));
    let ingest = Arc::new(IngestWorker::new(
        meta.clone(),
        vectors.clone(),
        gateway.clone(),
        Arc::new(FakeCourt),
        Sectionizer::new(),
        2,
    ));
    let scraper = Arc::new(ScrapeWorker::new(Arc::new(FakeCourt), ingest.clone()));
    let ctx = ToolContext::new(
        meta,
        vectors,
        gateway,
        factory,
        legislation,
        patterns,
        ingest,
        scraper,
        Arc::new(UploadParser::new()),
        meter,
    )
    .with_deadline(Duration::from_millis(20));
    let orchestrator = Orchestrator::new(ctx);

    let err = orchestrator
        .call(
            "summarize_document",
            json!({"text": "довгий договір підлягає підсумуванню"}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DEADLINE_EXCEEDED");
}

#[tokio::test]
async fn test_tools_list_is_complete() {
    let h = harness();
    let tools = h.orchestrator.list_tools();
    assert!(tools.len() >= 30, "only {} tools registered", tools.len());
    for descriptor in &tools {
        assert!(descriptor.input_schema.is_object());
        assert!(!descriptor.description.is_empty());
    }
    for name in [
        "get_legal_advice",
        "classify_intent",
        "search_precedents",
        "calculate_procedural_deadlines",
        "compare_documents",
        "bulk_ingest",
    ] {
        assert!(h.orchestrator.has_tool(name), "missing {name}");
    }
}

#[tokio::test]
async fn test_compare_documents_tool_classifies() {
    let h = harness();
    let output = h
        .orchestrator
        .call(
            "compare_documents",
            json!({
                "left": "строк оплати до 01.11.2024 без штрафних санкцій",
                "right": "строк оплати до 01.12.2024 зі штрафом у розмірі 5000 грн"
            }),
        )
        .await
        .unwrap();
    assert!(output.payload["critical"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_get_decision_ingests_missing() {
    let h = harness();
    let output = h
        .orchestrator
        .call("get_decision", json!({"external_id": "445566"}))
        .await
        .unwrap();
    assert_eq!(output.payload["document"]["external_id"], "445566");
    assert!(!output.payload["sections"].as_array().unwrap().is_empty());
    // The ingest path also populated the vector index.
    assert!(!h.vectors.is_empty().await);
}

#[tokio::test]
async fn test_monetary_claims_tool() {
    let h = harness();
    let output = h
        .orchestrator
        .call(
            "calculate_monetary_claims",
            json!({
                "principal_kopecks": 10_000_000u64,
                "date_from": "2024-01-01",
                "date_to": "2024-12-31"
            }),
        )
        .await
        .unwrap();
    assert_eq!(output.payload["days_overdue"], 365);
    // 3% annual over 365 days on 100 000.00 грн = 300 000 kopecks.
    assert_eq!(output.payload["interest_kopecks"], 300_000);
}
