#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use polisense_rag::{
    Chunk, DocumentIndex, Embedder, GenerationConfig, HashedEmbedder, LlmClient, Message,
    RagError, ResponseStream, Result,
};

pub const POLICY_CHUNKS: &[&str] = &[
    "Vacation policy: every employee earns twenty vacation days per year, requested through the HR portal.",
    "Security policy: badges must be worn at all times inside the Raccoon City facility.",
    "Expense policy: travel expenses are reimbursed within thirty days of submission.",
];

pub fn index_of(name: &str, texts: &[&str]) -> DocumentIndex {
    let embedder = Arc::new(HashedEmbedder::new(384).expect("dims"));
    let chunks: Vec<Chunk> = texts
        .iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            page: 1,
            index,
            text: text.to_string(),
        })
        .collect();
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).expect("hashed embedding never fails");
    DocumentIndex::new(name, chunks, vectors, embedder).expect("consistent index")
}

pub enum Reply {
    Fragments(Vec<&'static str>),
    RequestFails(&'static str),
    FailsAfter(Vec<&'static str>, &'static str),
}

/// Records every request and answers with a scripted reply.
pub struct MockLlm {
    reply: Reply,
    requests: Mutex<Vec<(Vec<Message>, GenerationConfig)>>,
}

impl MockLlm {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(fragments: Vec<&'static str>) -> Arc<Self> {
        Self::new(Reply::Fragments(fragments))
    }

    pub fn requests(&self) -> Vec<(Vec<Message>, GenerationConfig)> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmClient for MockLlm {
    fn stream_chat(&self, messages: &[Message], generation: &GenerationConfig) -> Result<ResponseStream> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), generation.clone()));
        let items: Vec<Result<String>> = match &self.reply {
            Reply::Fragments(parts) => parts.iter().map(|p| Ok(p.to_string())).collect(),
            Reply::RequestFails(msg) => return Err(RagError::Generation(msg.to_string())),
            Reply::FailsAfter(parts, msg) => parts
                .iter()
                .map(|p| Ok(p.to_string()))
                .chain(std::iter::once(Err(RagError::Generation(msg.to_string()))))
                .collect(),
        };
        Ok(Box::new(items.into_iter()))
    }
}

/// A minimal PDF with one text line per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
