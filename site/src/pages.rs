//! Page rendering and the chapter catalog.
//!
//! Templates are embedded at compile time and registered once; the chapter
//! catalog is static content compiled into the binary. Premium chapters are
//! only ever rendered behind a granted gate (see the chapter route).

use {minijinja::Environment, serde::Serialize};

/// Minijinja environment with every site template registered.
pub(crate) struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub(crate) fn new() -> Self {
        let mut env = Environment::new();

        for (name, source) in [
            ("base.html", include_str!("../templates/base.html")),
            ("landing.html", include_str!("../templates/landing.html")),
            (
                "walkthrough.html",
                include_str!("../templates/walkthrough.html"),
            ),
            ("toc.html", include_str!("../templates/toc.html")),
            ("chapter.html", include_str!("../templates/chapter.html")),
            ("denied.html", include_str!("../templates/denied.html")),
        ] {
            // Registration only fails on a template syntax error, which is
            // a build-time mistake, not a runtime condition.
            env.add_template(name, source)
                .expect("Site template must parse");
        }

        Self { env }
    }

    /// Renders a registered template. A render error is logged and replaced
    /// by a plain apology so a bad template cannot take a route down.
    pub(crate) fn render(&self, name: &str, ctx: minijinja::Value) -> String {
        let rendered = self
            .env
            .get_template(name)
            .and_then(|template| template.render(&ctx));

        match rendered {
            Ok(html) => html,
            Err(e) => {
                log::error!("Failed to render '{}': {}", name, e);
                "Something went wrong rendering this page.".to_string()
            }
        }
    }
}

/// One chapter of the webbook.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Chapter {
    pub(crate) slug: &'static str,
    pub(crate) title: &'static str,
    /// Premium chapters require a granted gate to render.
    pub(crate) premium: bool,
    pub(crate) body_html: &'static str,
}

pub(crate) const CHAPTERS: &[Chapter] = &[
    Chapter {
        slug: "getting-started",
        title: "Why Ergo, and Why a Webbook?",
        premium: false,
        body_html: "<p>Ergo is a proof-of-work blockchain with an extended \
            UTXO model, built for ordinary people rather than institutions. \
            This webbook walks you from your first wallet to writing simple \
            contracts, one short chapter at a time.</p>\
            <p>The first two chapters are free. The rest unlock when you buy \
            the book, paid in the very asset you are learning about.</p>",
    },
    Chapter {
        slug: "wallets",
        title: "Setting Up Your First Wallet",
        premium: false,
        body_html: "<p>Before anything else you need a wallet. We recommend \
            Nautilus, a browser extension wallet for Ergo. Install it, write \
            your seed phrase on paper, and never type it into a website.</p>\
            <p>Your wallet shows a receive address starting with a 9. That \
            string is safe to share; the seed phrase is not. Every exercise \
            later in the book assumes you have this set up.</p>",
    },
    Chapter {
        slug: "utxo-model",
        title: "The Extended UTXO Model",
        premium: true,
        body_html: "<p>Ergo accounts for value as boxes rather than account \
            balances. A transaction consumes whole boxes and creates new \
            ones, which makes transaction histories easy to audit and \
            contracts easy to reason about.</p>\
            <p>In this chapter we dissect a real transaction box by box and \
            follow the change outputs, the miner fee, and the registers that \
            carry contract data.</p>",
    },
    Chapter {
        slug: "storage-rent",
        title: "Storage Rent and Long-Term Holding",
        premium: true,
        body_html: "<p>Ergo charges a tiny rent on boxes untouched for four \
            years, keeping the UTXO set lean and miners paid far into the \
            future. Here is what that means for a long-term holder, and how \
            to consolidate old boxes cheaply.</p>",
    },
    Chapter {
        slug: "contracts",
        title: "ErgoScript Contracts by Example",
        premium: true,
        body_html: "<p>ErgoScript guards every box with a spending \
            condition. We start from the simplest possible contract, a \
            time-locked piggy bank, and build up to a two-party swap you can \
            deploy on testnet with the tools from chapter two.</p>",
    },
];

pub(crate) fn chapter_by_slug(slug: &str) -> Option<&'static Chapter> {
    CHAPTERS.iter().find(|chapter| chapter.slug == slug)
}
